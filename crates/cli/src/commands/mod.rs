pub mod doctor;
pub mod estimate;
pub mod run;
pub mod serve;
pub mod usage;
