mod client;

pub use client::ActuatorClient;
