use chanlog::prefix::Prefixer;
use chanlog::StampFormat;
use rand::distr::{Alphanumeric, SampleString};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

type Rand = SmallRng;

fn random_text(rng: &mut Rand) -> String {
    let mut text = String::new();
    for _ in 0..rng.random_range(0..64) {
        match rng.random_range(0..8) {
            0 => text.push('\n'),
            1 => text.push_str("\n\n"),
            2 => text.push_str("ñ€😀"),
            _ => {
                let len = rng.random_range(0..24);
                text.push_str(&Alphanumeric.sample_string(rng, len));
            }
        }
    }
    text
}

fn random_chunks<'a>(rng: &mut Rand, text: &'a str) -> Vec<&'a str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let mut at = rng.random_range(0..=rest.len());
        while !rest.is_char_boundary(at) {
            at += 1;
        }
        let (chunk, tail) = rest.split_at(at);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

#[test]
fn chunking_does_not_change_output() {
    let rng = &mut SmallRng::from_os_rng();
    let plain = StampFormat::DISABLED;
    for _ in 0..2000 {
        let text = random_text(rng);
        let expected = Prefixer::new("-ERR-| ").add_prefix(&text, &plain);

        let mut prefixer = Prefixer::new("-ERR-| ");
        let mut chunked = String::new();
        for chunk in random_chunks(rng, &text) {
            chunked.push_str(&prefixer.add_prefix(chunk, &plain));
        }
        assert_eq!(chunked, expected, "input: {text:?}");

        let line_starts = text.split_inclusive('\n').count();
        assert_eq!(expected.matches("-ERR-| ").count(), line_starts);
        assert_eq!(prefixer.at_line_start(), text.is_empty() || text.ends_with('\n'));
    }
}
