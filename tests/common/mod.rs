#![allow(dead_code)]

pub use buildgraph_test_utils::{
    init_tracing, with_timeout, ActionProbe, GraphFixture, RecordingObserver,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
