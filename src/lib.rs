pub mod error;
pub mod fetch;
pub mod links;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod state;
pub mod zones;
