pub(crate) mod save_string;
pub(crate) mod state;
