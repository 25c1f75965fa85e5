// Song layout: line building, row scheduling and rendered output

mod common;

use common::{Missing, Monospace, Truncated, HEADER};
use karaoke_wasm::models::{Edge, Song};
use karaoke_wasm::renderers::{
    Display, DisplayLine, LayoutConfig, LayoutError, LineRenderer, RenderedLine, SongLayout,
    FLOATS_PER_VERTEX,
};

const LYRICS: &str = "
[Lyrics]
K: さくら$
E: sa.ku.ra$
@: 0 1 1 2

K: {桜}(さくら)$
E: ha.na.mi$
@: 4 1 1 1
";

fn song(lyrics: &str) -> Song {
    Song::parse(&format!("{}{}", HEADER, lyrics)).unwrap()
}

fn layout(song: &Song, variant: &str) -> SongLayout {
    SongLayout::build(
        song,
        variant,
        &Monospace,
        Display::new(100.0, 50.0),
        LayoutConfig::default(),
    )
    .unwrap()
}

fn assert_no_row_overlaps(lines: &[DisplayLine]) {
    for a in lines {
        for b in lines {
            if std::ptr::eq(a, b) || a.row != b.row || a.start > b.start {
                continue;
            }
            assert!(
                a.end <= b.start,
                "{:?} ({}..{}) and {:?} ({}..{}) share row {}",
                a.text,
                a.start,
                a.end,
                b.text,
                b.start,
                b.end,
                a.row
            );
        }
    }
}

#[test]
fn test_overlapping_bottom_line_takes_row_zero() {
    let song = song(LYRICS);
    let layout = layout(&song, "both");

    let bottom = layout.lines(Edge::Bottom);
    let texts: Vec<&str> = bottom.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["さくら", "桜"]);
    assert_eq!(bottom[0].row, 1);
    assert_eq!(bottom[1].row, 0);
    assert_no_row_overlaps(bottom);
}

#[test]
fn test_glyphs_carry_timing_from_beats() {
    let song = song(LYRICS);
    let layout = layout(&song, "both");
    let bottom = layout.lines(Edge::Bottom);

    // Beats 2..4 at half a second per beat
    let ra = &bottom[0].glyphs[2];
    assert_eq!((ra.t1, ra.t2), (1.0, 2.0));
    assert_eq!(bottom[0].sung_span(), Some((0.0, 2.0)));
    assert_eq!(bottom[0].end, 3.0);

    // Base glyph plus three ruby glyphs, one particle per step
    let line = &bottom[1];
    assert_eq!(line.glyphs.len(), 4);
    assert_eq!((line.glyphs[1].t1, line.glyphs[1].t2), (2.0, 2.5));
    assert_eq!((line.glyphs[3].t1, line.glyphs[3].t2), (3.0, 3.5));
    assert!(line.glyphs[1].y > line.glyphs[0].y);
    assert!(line.ascender > bottom[0].ascender);
}

#[test]
fn test_top_edge_rows_and_pull_back() {
    let song = song(LYRICS);
    let layout = layout(&song, "both");
    let top = layout.lines(Edge::Top);

    assert_eq!(top[0].text, "sakura");
    assert_eq!(top[1].text, "hanami");
    assert_eq!((top[0].row, top[1].row), (0, 1));

    // Appears 1.5 s after the line below it, not before
    assert_eq!(top[1].start, 0.5);
    assert!(top[0].y > top[1].y);
}

#[test]
fn test_visible_lines_follow_time() {
    let song = song(LYRICS);
    let layout = layout(&song, "both");

    assert_eq!(layout.visible_lines(-2.0).count(), 0);
    assert_eq!(layout.visible_lines(0.0).count(), 3);
    assert_eq!(layout.visible_lines(4.4).count(), 2);
    assert_eq!(layout.visible_lines(5.0).count(), 0);
    assert_eq!(layout.end_time(), 4.5);

    struct Count(usize, usize);
    impl LineRenderer for Count {
        fn draw_line(&mut self, line: &RenderedLine) {
            self.0 += 1;
            self.1 += line.glyph_count();
        }
    }
    let mut count = Count(0, 0);
    layout.draw(1.0, &mut count);
    assert_eq!(count.0, 4);
    assert_eq!(count.1, 3 + 4 + 6 + 6);
}

#[test]
fn test_rendered_buffers() {
    let song = song(LYRICS);
    let mut layout = layout(&song, "both");

    for line in layout.rendered() {
        let glyphs = line.glyph_count();
        assert_eq!(line.vertices.len(), glyphs * 4 * FLOATS_PER_VERTEX);
        assert_eq!(line.indices.len(), glyphs * 6);
        assert!(line.indices.iter().all(|&i| (i as usize) < glyphs * 4));
    }

    assert!(layout.atlas().is_dirty());
    assert!(layout.atlas_mut().take_upload().is_some());
    assert!(layout.atlas_mut().take_upload().is_none());
}

#[test]
fn test_variant_selects_tags() {
    let song = song(LYRICS);
    let layout = layout(&song, "english");
    assert_eq!(layout.lines(Edge::Top).len(), 0);
    let texts: Vec<&str> = layout.lines(Edge::Bottom).iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["sakura", "hanami"]);
}

#[test]
fn test_generated_song_never_overlaps() {
    let mut seed: u32 = 99;
    let mut next = || {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        (seed >> 16) as u32
    };

    let mut lyrics = String::from("\n[Lyrics]\n");
    let mut beat = 0;
    for _ in 0..60 {
        beat += 4 + next() % 3;
        let d1 = 1 + next() % 2;
        let d2 = 1 + next() % 2;
        lyrics.push_str(&format!("K: らら$\nE: la.la$\n@: {} {} {}\n\n", beat, d1, d2));
    }

    let song = song(&lyrics);
    let layout = layout(&song, "both");
    assert_eq!(layout.lines(Edge::Bottom).len(), 60);
    assert_no_row_overlaps(layout.lines(Edge::Bottom));
    assert_no_row_overlaps(layout.lines(Edge::Top));
}

#[test]
fn test_font_failure_aborts_build() {
    let song = song(LYRICS);
    let result = SongLayout::build(
        &song,
        "both",
        &Missing,
        Display::default(),
        LayoutConfig::default(),
    );
    match result {
        Err(LayoutError::Font(e)) => assert_eq!(e.font, "Main.ttf"),
        other => panic!("expected a font error, got {:?}", other.err()),
    }
}

#[test]
fn test_truncated_glyph_bitmap_fails_layout() {
    let song = song(LYRICS);
    let result = SongLayout::build(
        &song,
        "both",
        &Truncated,
        Display::default(),
        LayoutConfig::default(),
    );
    match result {
        Err(LayoutError::Font(e)) => {
            assert_eq!(e.font, "Main.ttf");
            assert!(e.message.contains("expected 2x2"));
        }
        other => panic!("expected a font error, got {:?}", other.err()),
    }
}

#[test]
fn test_unknown_variant() {
    let song = song(LYRICS);
    let result = SongLayout::build(
        &song,
        "karaoke",
        &Monospace,
        Display::default(),
        LayoutConfig::default(),
    );
    assert!(matches!(result, Err(LayoutError::UnknownVariant(_))));
}
