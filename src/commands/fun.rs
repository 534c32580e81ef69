//! Fun commands: 8ball, coin, roll

use rand::seq::IndexedRandom;
use rand::Rng;

pub const EIGHT_BALL_ANSWERS: &[&str] = &[
    "It is certain.",
    "Without a doubt.",
    "You may rely on it.",
    "Ask again later.",
    "Better not tell you now.",
    "Very doubtful.",
    "My sources say no.",
    "Signs point to yes.",
    "Absolutely!",
    "No way.",
];

pub const COIN_FACES: &[&str] = &["Heads 🪙", "Tails 🪙"];

pub const DEFAULT_SIDES: i64 = 6;
pub const MIN_SIDES: i64 = 2;
pub const MAX_SIDES: i64 = 1_000_000;

pub fn eight_ball<R: Rng>(question: &str, rng: &mut R) -> String {
    let answer = EIGHT_BALL_ANSWERS.choose(rng).copied().unwrap_or("Ask again later.");
    format!("🎱 Question: {}\nAnswer: **{}**", question, answer)
}

pub fn coin<R: Rng>(rng: &mut R) -> String {
    COIN_FACES.choose(rng).copied().unwrap_or("Heads 🪙").to_string()
}

/// Rolls a die, or `None` when `sides` is out of range.
pub fn roll_die<R: Rng>(sides: i64, rng: &mut R) -> Option<i64> {
    if !(MIN_SIDES..=MAX_SIDES).contains(&sides) {
        return None;
    }
    Some(rng.random_range(1..=sides))
}

pub fn roll<R: Rng>(sides: i64, rng: &mut R) -> String {
    match roll_die(sides, rng) {
        Some(result) => format!("🎲 d{} -> **{}**", sides, result),
        None => "Please choose a number between 2 and 1,000,000.".to_string(),
    }
}
