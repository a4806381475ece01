pub mod controller;
pub mod state;

pub use controller::FlowController;
pub use state::{FlowState, Phase};
