pub mod batch_processor;
pub mod connector;
pub mod path_lister;
pub mod queue_sender;
