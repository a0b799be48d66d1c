// On-disk game and tournament records.
//
// Finished sessions are written as `<timestamp>_<sente>_<gote>.csa` and
// `.json`; finished tournaments as `<timestamp>_<p1>_<p2>_trn.txt`. Names
// are sanitised for filenames: `;:\/*?"<>|'` are dropped and spaces become
// `-`. The games directory is created on first write. A record never
// replaces an earlier one: when the stem is taken (two games between the
// same pair in the same second), `-2`, `-3`, ... is appended.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use usi_arena_protocol::Color;

use crate::kif::KifRecorder;
use crate::outcome::GameOverReason;

const FORBIDDEN: &[char] = &[';', ':', '\\', '/', '*', '?', '"', '<', '>', '|', '\''];

/// Make an engine name safe to embed in a filename.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| !FORBIDDEN.contains(c))
        .map(|c| if c == ' ' { '-' } else { c })
        .collect()
}

pub fn timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

/// `<timestamp>_<name1>_<name2>` with sanitised names.
pub fn file_stem(at: DateTime<Local>, name1: &str, name2: &str) -> String {
    format!(
        "{}_{}_{}",
        timestamp(at),
        sanitize(name1),
        sanitize(name2)
    )
}

pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the CSA and JSON records of one game. Returns the CSA path.
    pub fn write_game(
        &self,
        at: DateTime<Local>,
        kif: &KifRecorder,
        reason: Option<GameOverReason>,
    ) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let stem = file_stem(at, kif.name(Color::Black), kif.name(Color::White));
        let (stem, csa_path, mut csa) = self.create_unique(&stem, ".csa")?;
        csa.write_all(kif.to_csa(reason).as_bytes())?;
        let json = kif.to_json(reason).map_err(io::Error::other)?;
        fs::write(self.dir.join(format!("{stem}.json")), json)?;
        Ok(csa_path)
    }

    pub fn write_tournament(
        &self,
        at: DateTime<Local>,
        players: &[String],
        summary: &str,
    ) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let first = players.first().map_or("", String::as_str);
        let second = players.get(1).map_or("", String::as_str);
        let (_, path, mut file) = self.create_unique(&file_stem(at, first, second), "_trn.txt")?;
        file.write_all(summary.as_bytes())?;
        Ok(path)
    }

    /// Create `<stem><suffix>` in the games directory, numbering the stem
    /// until the name is free. Returns the stem actually used.
    fn create_unique(&self, stem: &str, suffix: &str) -> io::Result<(String, PathBuf, File)> {
        let mut n = 1u32;
        loop {
            let candidate = if n == 1 {
                stem.to_owned()
            } else {
                format!("{stem}-{n}")
            };
            let path = self.dir.join(format!("{candidate}{suffix}"));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((candidate, path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e),
            }
        }
    }
}
