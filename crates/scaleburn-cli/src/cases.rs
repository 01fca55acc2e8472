use scaleburn_core::{ChatMessage, TestCase};

const PREFILL_PASSAGE: &str = "The harbor town woke slowly under a low grey sky. Fishing boats \
returned one by one, their hulls heavy with the night's catch, while merchants rolled carts \
across the wet cobblestones toward the market square. Children ran between the stalls, chasing \
gulls and dodging the sharp words of the fishmongers. In the old lighthouse a keeper recorded \
the weather in a leather journal, noting the wind from the north-east and the falling pressure. \
Farther inland, farmers inspected fields that had flooded twice that spring, wondering whether \
the barley would recover in time for harvest. The council met in the afternoon to debate repairs \
to the sea wall, the cost of new nets, and a proposal to build a school near the chapel. Nobody \
agreed on the budget, but everyone agreed that the storms were getting worse each year.";

/// Prompt-processing workload: long input, a single output token.
pub fn prefill(profile: &[u32], paragraphs: usize) -> TestCase {
    let text = vec![PREFILL_PASSAGE; paragraphs.max(1)].join(" ");

    TestCase::new(
        vec![
            ChatMessage::system("You are helpful assistant. Summarize a given text."),
            ChatMessage::user(text),
        ],
        profile.to_vec(),
    )
    .with_temperature(0.2)
    .with_max_tokens(1)
}

/// Generation workload: trivial input, long output.
pub fn decode(profile: &[u32]) -> TestCase {
    TestCase::new(vec![ChatMessage::user("?")], profile.to_vec())
        .with_temperature(1.0)
        .with_max_tokens(512)
}
