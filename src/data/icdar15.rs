// ============================================================
// Layer 4 — ICDAR15 Word-Recognition Corpus Loader
// ============================================================
// Expected layout under the dataset root:
//
//   <root>/
//     ch4_training_word_images_gt/
//       gt.txt                             ← Train
//       word_1.png, word_2.png, ...
//     ch4_test_word_images_gt/
//       Challenge4_Test_Task3_GT.txt       ← Eval
//       word_1.png, ...
//
// Each ground-truth line reads:
//
//   word_1.png, "Genaxis Theatre"
//
// The files ship with a UTF-8 BOM and use \" for quotes inside
// a transcription. Lines that do not parse are skipped.

use anyhow::{Context, Result};
use image::DynamicImage;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::transform::TransformCrnn;
use crate::domain::{
    charset::Charset,
    sample::{min_ctc_steps, CorpusMode},
};

/// Image directory and ground-truth file for one corpus view.
pub fn corpus_paths(root: &Path, mode: CorpusMode) -> (PathBuf, PathBuf) {
    match mode {
        CorpusMode::Train => {
            let dir = root.join("ch4_training_word_images_gt");
            let gt  = dir.join("gt.txt");
            (dir, gt)
        }
        CorpusMode::Eval => {
            let dir = root.join("ch4_test_word_images_gt");
            let gt  = dir.join("Challenge4_Test_Task3_GT.txt");
            (dir, gt)
        }
    }
}

/// Split one ground-truth line into (file name, transcription).
pub fn parse_gt_line(line: &str) -> Option<(String, String)> {
    let line = line.trim_start_matches('\u{FEFF}').trim();
    let (file, rest) = line.split_once(',')?;
    let file = file.trim();
    if file.is_empty() {
        return None;
    }

    let rest = rest.trim();
    let text = match rest.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        Some(quoted) => quoted.replace("\\\"", "\"").replace("\\\\", "\\"),
        None         => rest.to_string(),
    };
    Some((file.to_string(), text))
}

/// Decode every image of a corpus view and encode its transcription.
///
/// Two kinds of samples are skipped with a warning:
///   - labels that are empty after charset filtering
///   - labels that cannot be aligned within `max_steps` model outputs
pub fn load_corpus(
    root:      &Path,
    mode:      CorpusMode,
    charset:   &Charset,
    transform: &TransformCrnn,
    max_steps: usize,
) -> Result<Vec<(DynamicImage, Vec<u32>)>> {
    let (img_dir, gt_path) = corpus_paths(root, mode);

    // Step 1: read the ground-truth file
    let gt = fs::read_to_string(&gt_path)
        .with_context(|| format!("Cannot read {} ground truth '{}'", mode, gt_path.display()))?;

    let mut samples  = Vec::new();
    let mut skipped  = 0usize;
    let mut too_long = 0usize;

    for (file, text) in gt.lines().filter_map(parse_gt_line) {
        // Step 2: encode, dropping characters outside the charset
        let label = charset.encode(&text);
        if label.is_empty() {
            skipped += 1;
            continue;
        }
        if min_ctc_steps(&label) > max_steps {
            too_long += 1;
            continue;
        }

        // Step 3: decode and resize the crop once

        let path = img_dir.join(&file);
        let img = image::open(&path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
        samples.push((transform.prepare(img), label));
    }

    if skipped > 0 {
        tracing::warn!(
            "Skipped {} {} samples with no encodable characters",
            skipped,
            mode
        );
    }
    if too_long > 0 {
        tracing::warn!(
            "Skipped {} {} samples whose labels need more than {} time steps",
            too_long,
            mode,
            max_steps
        );
    }
    tracing::info!("Loaded {} {} samples from '{}'", samples.len(), mode, img_dir.display());

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::ImageShape;
    use image::{GrayImage, Luma};

    #[test]
    fn test_parse_plain_line() {
        let (file, text) = parse_gt_line("word_1.png, \"Genaxis Theatre\"").unwrap();
        assert_eq!(file, "word_1.png");
        assert_eq!(text, "Genaxis Theatre");
    }

    #[test]
    fn test_parse_strips_bom_and_escapes() {
        let (file, text) = parse_gt_line("\u{FEFF}word_9.png, \"\\\"OK\\\"\"\r").unwrap();
        assert_eq!(file, "word_9.png");
        assert_eq!(text, "\"OK\"");
    }

    #[test]
    fn test_parse_keeps_commas_inside_text() {
        let (_, text) = parse_gt_line("word_3.png, \"a,b\"").unwrap();
        assert_eq!(text, "a,b");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_gt_line("").is_none());
        assert!(parse_gt_line("no separator").is_none());
    }

    #[test]
    fn test_load_corpus_skips_unencodable_labels() {
        let root = tempfile::tempdir().unwrap();
        let (dir, gt) = corpus_paths(root.path(), CorpusMode::Train);
        fs::create_dir_all(&dir).unwrap();

        for name in ["word_1.png", "word_2.png"] {
            GrayImage::from_pixel(20, 8, Luma([128])).save(dir.join(name)).unwrap();
        }
        fs::write(&gt, "\u{FEFF}word_1.png, \"Hi5\"\nword_2.png, \"###\"\n").unwrap();

        let charset   = Charset::new("0123456789abcdefghijklmnopqrstuvwxyz", true).unwrap();
        let transform = TransformCrnn::new(ImageShape::new(1, 32, 100), false);
        let samples   = load_corpus(root.path(), CorpusMode::Train, &charset, &transform, 26).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].1, charset.encode("hi5"));
        assert_eq!(samples[0].0.width(), 100);
    }

    #[test]
    fn test_missing_ground_truth_is_an_error() {
        let root      = tempfile::tempdir().unwrap();
        let charset   = Charset::new("abc", true).unwrap();
        let transform = TransformCrnn::new(ImageShape::new(1, 32, 100), false);
        assert!(load_corpus(root.path(), CorpusMode::Eval, &charset, &transform, 26).is_err());
    }

    #[test]
    fn test_load_corpus_skips_labels_longer_than_time_steps() {
        let root = tempfile::tempdir().unwrap();
        let (dir, gt) = corpus_paths(root.path(), CorpusMode::Train);
        fs::create_dir_all(&dir).unwrap();

        for name in ["word_1.png", "word_2.png", "word_3.png"] {
            GrayImage::from_pixel(20, 8, Luma([128])).save(dir.join(name)).unwrap();
        }
        // With 5 steps: "abcab" fits, "abcabc" is one too long, "aab" needs 4 and fits
        fs::write(&gt, "word_1.png, \"abcab\"\nword_2.png, \"abcabc\"\nword_3.png, \"aab\"\n").unwrap();

        let charset   = Charset::new("abc", true).unwrap();
        let transform = TransformCrnn::new(ImageShape::new(1, 32, 16), false);
        let samples   = load_corpus(root.path(), CorpusMode::Train, &charset, &transform, 5).unwrap();

        let labels: Vec<Vec<u32>> = samples.into_iter().map(|(_, l)| l).collect();
        assert_eq!(labels, vec![charset.encode("abcab"), charset.encode("aab")]);
    }
}
