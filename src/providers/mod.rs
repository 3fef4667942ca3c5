pub mod mozilla;
