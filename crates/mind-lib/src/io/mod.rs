pub mod condition;
pub mod participant;

pub use condition::{read_condition_csv, ColumnSpec};
pub use participant::{list_participants, locate_condition_files, ConditionFiles, Participant};
