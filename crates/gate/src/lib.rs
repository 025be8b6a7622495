pub mod alert_gate;

pub use alert_gate::AlertGate;
