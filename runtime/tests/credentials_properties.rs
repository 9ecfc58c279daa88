//! Property tests for credential loading.

#![allow(clippy::unwrap_used)] // Tests can unwrap

use convograph_runtime::config::{NEO4J_CONNECTION, NEO4J_PASSWORD, NEO4J_USERNAME};
use convograph_runtime::{ConfigError, Credentials};
use proptest::prelude::*;

const VARS: [&str; 3] = [NEO4J_CONNECTION, NEO4J_USERNAME, NEO4J_PASSWORD];

proptest! {
    /// Loading succeeds iff all three variables are present and non-empty,
    /// and otherwise names the first missing one.
    #[test]
    fn credentials_require_every_variable(
        present in prop::array::uniform3(any::<bool>()),
        values in prop::array::uniform3("[a-z0-9:/@.]{0,12}"),
    ) {
        let lookup = |var: &str| {
            VARS.iter()
                .position(|candidate| *candidate == var)
                .filter(|index| present[*index])
                .map(|index| values[index].clone())
        };

        let first_missing = (0..3).find(|index| !present[*index] || values[*index].is_empty());

        match (Credentials::from_lookup(lookup), first_missing) {
            (Ok(credentials), None) => {
                prop_assert_eq!(credentials.connection(), values[0].as_str());
                prop_assert_eq!(credentials.username(), values[1].as_str());
            },
            (Err(ConfigError::MissingVar(var)), Some(index)) => prop_assert_eq!(var, VARS[index]),
            (outcome, expected) => prop_assert!(false, "unexpected {:?} for missing {:?}", outcome, expected),
        }
    }
}
