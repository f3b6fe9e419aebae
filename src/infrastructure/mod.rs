pub mod clipboard;
pub mod external;
