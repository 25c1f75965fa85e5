// Lyric markup segmentation across the four scripts

use karaoke_wasm::parse::{ParseErrorKind, Script};

fn texts(script: Script, source: &str) -> Vec<String> {
    script
        .parse(source)
        .unwrap()
        .atoms
        .into_iter()
        .map(|a| a.text)
        .collect()
}

#[test]
fn test_single_ruby_atom() {
    let molecule = Script::Japanese.parse("あ(が)").unwrap();
    assert_eq!(molecule.atoms.len(), 1);
    assert_eq!(molecule.text(), "あ");
    assert!(molecule.has_ruby());
    assert_eq!(molecule.steps(), 1);
}

#[test]
fn test_each_script_splits_its_own_way() {
    assert_eq!(texts(Script::Japanese, "さくら"), vec!["さ", "く", "ら"]);
    assert_eq!(texts(Script::Romaji, "sakura"), vec!["sa", "ku", "ra"]);
    assert_eq!(texts(Script::Latin, "canto"), vec!["can", "to"]);
    assert_eq!(texts(Script::English, "there"), vec!["there"]);
}

#[test]
fn test_capitals_split_with_word_final_rules() {
    assert_eq!(texts(Script::English, "HEY"), vec!["HE", "Y"]);
    assert_eq!(texts(Script::English, "THERE there"), vec!["THE", "RE ", "there"]);
    assert_eq!(Script::English.parse("HEY").unwrap().steps(), 2);
}

#[test]
fn test_vowel_after_group_is_its_own_syllable() {
    assert_eq!(texts(Script::Latin, "an{x}a"), vec!["an", "x", "a"]);
    assert_eq!(texts(Script::Latin, "égt{b}e"), vec!["égt", "b", "e"]);
}

#[test]
fn test_parentheses_are_ruby_only_in_japanese() {
    let molecule = Script::English.parse("oh (yeah)").unwrap();
    assert!(!molecule.has_ruby());
    assert!(molecule.text().contains('('));
}

#[test]
fn test_markup_errors() {
    assert_eq!(
        Script::Japanese.parse("(あ)").unwrap_err(),
        ParseErrorKind::RubyWithoutAtom
    );
    assert!(Script::Latin.parse("{open").is_err());
    assert!(Script::Japanese.parse("あ(い").is_err());
}

#[test]
fn test_break_and_row_markers() {
    let molecule = Script::Romaji.parse("$^3sora$").unwrap();
    assert!(molecule.break_before);
    assert!(molecule.break_after);
    assert_eq!(molecule.row, Some(3));
    assert_eq!(molecule.text(), "sora");
}

#[test]
fn test_segmentation_is_idempotent() {
    let cases = [
        (Script::Japanese, "きょうは{今日}(きょう)、いい天(てん)気(き)だね！"),
        (Script::Japanese, "$君(きみ)の{名前}({な}{まえ})は$"),
        (Script::Japanese, "あ\\、い"),
        (Script::Romaji, "kyou wa ii tenki da ne"),
        (Script::Romaji, "$^1shinkansen, kitte"),
        (Script::Latin, "bue.no {fuego} y agua"),
        (Script::English, "\"oh baby, baby\" {fire}work$"),
    ];
    for (script, source) in cases {
        let first = script.parse(source).unwrap();
        let serialized = first.to_source();
        let second = script.parse(&serialized).unwrap();
        assert_eq!(first.atoms, second.atoms, "{:?} -> {:?}", source, serialized);
        assert_eq!(first.steps(), second.steps());
        assert_eq!(
            (first.break_before, first.break_after, first.row),
            (second.break_before, second.break_after, second.row)
        );
        // Serializing again changes nothing
        assert_eq!(second.to_source(), serialized);
    }
}
