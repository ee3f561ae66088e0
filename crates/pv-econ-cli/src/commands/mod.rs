pub mod evaluate;
pub mod loan;
pub mod stage;
pub mod stakeholder;
pub mod tornado;
