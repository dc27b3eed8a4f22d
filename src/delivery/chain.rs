//! Ordered fallback over delivery strategies
//!
//! Each step is tried once, in order, and the first success ends the chain.
//! Unlike a retry loop there is no sleep between steps: the next step is a
//! different way of making the same request, not the same request again.

use std::fmt::Display;
use std::future::Future;
use tracing::{debug, info, warn};

/// Run `attempt` for each step until one succeeds
///
/// # Arguments
/// * `steps` - Strategies in order of preference
/// * `operation_name` - Name for logging purposes
/// * `attempt` - The async operation to execute for a step
///
/// # Returns
/// The step that succeeded, or `None` if every step failed
pub async fn first_success<S, F, Fut, E>(
    steps: &[S],
    operation_name: &str,
    mut attempt: F,
) -> Option<S>
where
    S: Copy + Display,
    F: FnMut(S) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    for (index, step) in steps.iter().copied().enumerate() {
        match attempt(step).await {
            Ok(()) => {
                if index > 0 {
                    info!(
                        operation = operation_name,
                        strategy = %step,
                        fallbacks = index,
                        "Succeeded with fallback strategy"
                    );
                } else {
                    debug!(operation = operation_name, strategy = %step, "Succeeded");
                }
                return Some(step);
            }
            Err(e) => {
                warn!(
                    operation = operation_name,
                    strategy = %step,
                    remaining = steps.len() - index - 1,
                    "Strategy failed: {}",
                    e
                );
            }
        }
    }

    warn!(
        operation = operation_name,
        attempts = steps.len(),
        "All strategies failed"
    );
    None
}
