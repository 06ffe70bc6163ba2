//! Graph Traffic Simulation Library
//!
//! A cellular-automaton traffic simulation on a directed road graph,
//! exposing a step/reset interface for traffic-light control experiments.

pub mod simulation;
