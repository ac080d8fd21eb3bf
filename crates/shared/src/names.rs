//! Random anonymous display handles such as `zippy-panda-417`.

use rand::seq::SliceRandom;
use rand::Rng;

const WORDS: &[&str] = &[
    "silly", "goofy", "wacky", "zany", "bouncy", "bubbly", "chirpy", "dizzy", "fizzy", "giggly",
    "happy", "jolly", "lively", "peppy", "snappy", "spunky", "wiggly", "zippy",
];

const ANIMALS: &[&str] = &[
    "panda", "bunny", "puppy", "kitty", "duck", "frog", "bear", "pig", "bee", "bug", "fish",
    "bird", "cat", "dog", "cow", "hen", "ant", "bat", "rat",
];

/// Generates a handle of the form `<word>-<animal>-<1..=999>`.
pub fn anonymous_username() -> String {
    let mut rng = rand::thread_rng();
    let word = WORDS.choose(&mut rng).copied().unwrap_or("quiet");
    let animal = ANIMALS.choose(&mut rng).copied().unwrap_or("owl");
    let number: u16 = rng.gen_range(1..=999);
    format!("{word}-{animal}-{number}")
}
