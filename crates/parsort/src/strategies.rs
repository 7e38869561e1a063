pub(crate) mod common;
pub(crate) mod data_parallel;
pub(crate) mod hybrid;
pub(crate) mod sequential;
pub(crate) mod task_parallel;
