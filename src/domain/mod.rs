pub mod admission;
pub mod clock;
pub mod events;
pub mod forwarding;
pub mod graph;
pub mod hosts;
pub mod id;
pub mod ledger;
pub mod path_finder;
pub mod reservation;
