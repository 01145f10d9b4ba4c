// The analyzer library: one `impl Analyzer` per detection technique,
// grouped by symbol family and assembled by the registry.
pub mod analyzers;

// Weighted signal aggregation into a market bias
pub mod confluence;

// The supervised background worker driving the per-iteration fetch ->
// analyze -> aggregate -> publish cycle
pub mod engine;

// Parallel per-timeframe confluence + weighted merge
pub mod orchestrator;

// Account/server change detection
pub mod session;

// Bootstrap: builds and starts the whole running system
pub mod system;
