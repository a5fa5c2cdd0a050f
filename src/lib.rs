// Geodesic maths and polyline decoding
pub mod geo;

// Runtime configuration
pub mod config;

// World state store and entity types
pub mod world;

// World events and in-process fan-out
pub mod event;

// Route provider adapter
pub mod routing;

// Movement engine
pub mod movement;

// Hazard engine
pub mod hazard;

// Command surface and tool dispatch
pub mod commands;

// Tick scheduler and single-writer engine
pub mod engine;

// NATS message bus integration
pub mod bus;

// HTTP and WebSocket APIs
pub mod api;

// Subscription management
pub mod subscription;
