//! Scenario tests for object lifecycle and light tiers
