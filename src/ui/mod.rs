/// User interface pieces
///
/// - Identification result panel (result_panel.rs)

pub mod result_panel;

pub use result_panel::ResultCard;
