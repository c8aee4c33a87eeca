pub const fn default_as_true() -> bool { true }
