//! Synthetic input generator.
//!
//! Appends a random character (or occasionally a whole word) to the target
//! on an irregular cadence. At capacity the field is cleared and typing
//! starts over, so the loop runs for as long as the cycle is live.

use super::random::{self, RandomSource};
use super::LoopContext;
use crate::host::TargetElement;
use std::sync::Arc;
use tracing::debug;

/// Words occasionally typed whole.
pub const VOCABULARY: [&str; 20] = [
    "rust", "tokio", "compiler", "borrow", "lifetime", "trait", "module", "crate", "async",
    "future", "channel", "thread", "pattern", "closure", "iterator", "macro", "generic",
    "runtime", "buffer", "pointer",
];

/// Characters typed one at a time.
pub const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789.,;:!? ";

/// What a single typing tick did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    /// The buffer was at capacity and got emptied
    Cleared,
    Character(char),
    Word(&'static str),
    /// The chosen word did not fit
    Skipped,
}

/// Compute the buffer after one tick.
///
/// Returns the new value (if it changed) and what happened. Lengths are
/// counted in characters.
pub fn next_value(
    current: &str,
    capacity: usize,
    word_probability: f64,
    random: &mut dyn RandomSource,
) -> (Option<String>, Keystroke) {
    let len = current.chars().count();
    if len >= capacity {
        return (Some(String::new()), Keystroke::Cleared);
    }

    if random.unit() < word_probability {
        let word = VOCABULARY[random.below(VOCABULARY.len())];
        let separator = if current.is_empty() || current.ends_with(' ') {
            ""
        } else {
            " "
        };
        if len + separator.len() + word.chars().count() > capacity {
            return (None, Keystroke::Skipped);
        }
        (
            Some(format!("{current}{separator}{word}")),
            Keystroke::Word(word),
        )
    } else {
        let chars: Vec<char> = ALPHABET.chars().collect();
        let ch = chars[random.below(chars.len())];
        let mut next = String::with_capacity(current.len() + ch.len_utf8());
        next.push_str(current);
        next.push(ch);
        (Some(next), Keystroke::Character(ch))
    }
}

/// Capacity of a target, falling back to `default` when it declares none.
pub fn capacity_of(target: &dyn TargetElement, default: usize) -> usize {
    target.max_length().filter(|&n| n > 0).unwrap_or(default)
}

/// Apply one tick to the target.
pub(crate) fn type_once(ctx: &LoopContext, target: &dyn TargetElement) -> Keystroke {
    let current = target.value();
    let capacity = capacity_of(target, ctx.config.default_capacity);
    let (next, keystroke) = random::with(&ctx.random, |r| {
        next_value(&current, capacity, ctx.config.word_probability, r)
    });

    if let Some(value) = next {
        target.set_value(value);
    }
    match keystroke {
        Keystroke::Cleared => ctx.log.record_buffer_reset(),
        Keystroke::Character(_) => ctx.log.record_character(),
        Keystroke::Word(_) => ctx.log.record_word(),
        Keystroke::Skipped => {}
    }

    // Keep the caret at the tail
    target.focus();
    let end = target.value().chars().count();
    target.set_selection_range(end, end);

    keystroke
}

/// Run the typing loop until the cycle ends.
pub(crate) async fn run(ctx: LoopContext, target: Arc<dyn TargetElement>) {
    let token = ctx.cycle.token().clone();
    loop {
        let delay = random::with(&ctx.random, |r| ctx.config.typing.delay(r.unit()));
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        match ctx.cycle.run(|| type_once(&ctx, target.as_ref())) {
            Some(keystroke) => debug!(cycle = %ctx.cycle.id(), ?keystroke, "typing tick"),
            None => break,
        }
    }
    debug!(cycle = %ctx.cycle.id(), "typing loop stopped");
}
