use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context as _;

use crate::config::BookLayout;
use crate::dom::{escape_attr, escape_text};
use crate::transform::TransformedChapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fresh,
    Open,
    Closed,
}

/// Append-only text output. Every write is flushed before returning so the
/// file is usable up to the last completed write.
#[derive(Debug)]
pub struct TextChannel<W: Write> {
    name: &'static str,
    writer: W,
    phase: Phase,
}

impl<W: Write> TextChannel<W> {
    pub fn new(name: &'static str, writer: W) -> Self {
        Self {
            name,
            writer,
            phase: Phase::Fresh,
        }
    }

    pub fn write_preamble(&mut self, text: &str) -> anyhow::Result<()> {
        if self.phase != Phase::Fresh {
            anyhow::bail!("{} preamble must be written before any content", self.name);
        }
        self.write_flushed(text)?;
        self.phase = Phase::Open;
        Ok(())
    }

    pub fn append(&mut self, text: &str) -> anyhow::Result<()> {
        if self.phase == Phase::Closed {
            anyhow::bail!("{} is already closed", self.name);
        }
        self.write_flushed(text)?;
        self.phase = Phase::Open;
        Ok(())
    }

    pub fn write_closer(&mut self, text: &str) -> anyhow::Result<()> {
        if self.phase == Phase::Closed {
            anyhow::bail!("{} is already closed", self.name);
        }
        self.write_flushed(text)?;
        self.phase = Phase::Closed;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_flushed(&mut self, text: &str) -> anyhow::Result<()> {
        self.writer
            .write_all(text.as_bytes())
            .with_context(|| format!("write {}", self.name))?;
        self.writer
            .flush()
            .with_context(|| format!("flush {}", self.name))
    }
}

/// The three per-book outputs: main text, TOC, image manifest.
#[derive(Debug)]
pub struct BookSink<W: Write> {
    layout: BookLayout,
    main: TextChannel<W>,
    toc: TextChannel<W>,
    manifest: TextChannel<W>,
}

impl BookSink<BufWriter<File>> {
    /// Creates the main, TOC and manifest files under `out_dir`. Existing files
    /// are never overwritten.
    pub fn create(out_dir: &Path, layout: &BookLayout) -> anyhow::Result<Self> {
        let main = create_new(&out_dir.join(&layout.main_file))?;
        let toc = create_new(&out_dir.join(&layout.toc_file))?;
        let manifest = create_new(&out_dir.join(&layout.manifest_file))?;
        Ok(Self::new(layout.clone(), main, toc, manifest))
    }
}

fn create_new(path: &Path) -> anyhow::Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .with_context(|| format!("create output: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

impl<W: Write> BookSink<W> {
    pub fn new(layout: BookLayout, main: W, toc: W, manifest: W) -> Self {
        Self {
            layout,
            main: TextChannel::new("main document", main),
            toc: TextChannel::new("toc document", toc),
            manifest: TextChannel::new("image manifest", manifest),
        }
    }

    pub fn open(&mut self) -> anyhow::Result<()> {
        self.main.write_preamble(&main_preamble(&self.layout))?;
        self.toc.write_preamble(&toc_preamble(&self.layout))?;
        Ok(())
    }

    /// Main fragment first, then the TOC entries, then the manifest records.
    pub fn append_chapter(&mut self, chapter: &TransformedChapter) -> anyhow::Result<()> {
        self.main.append(&format!("{}\n", chapter.fragment))?;
        if !chapter.toc_entries.is_empty() {
            self.toc.append(&chapter.toc_html(&self.layout))?;
        }
        if !chapter.images.is_empty() {
            self.manifest.append(&chapter.manifest_text())?;
        }
        Ok(())
    }

    pub fn close(&mut self) -> anyhow::Result<()> {
        self.main.write_closer(MAIN_CLOSER)?;
        self.toc.write_closer(TOC_CLOSER)?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.main.is_closed() && self.toc.is_closed()
    }

    /// Returns the main, TOC and manifest writers.
    pub fn into_inner(self) -> (W, W, W) {
        (
            self.main.into_inner(),
            self.toc.into_inner(),
            self.manifest.into_inner(),
        )
    }
}

const MAIN_CLOSER: &str = "</div>\n</body>\n</html>\n";
const TOC_CLOSER: &str = "</body>\n</html>\n";

fn head(title: &str, layout: &BookLayout) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape_text(title)));
    for stylesheet in &layout.stylesheets {
        out.push_str(&format!(
            "<link type=\"text/css\" rel=\"stylesheet\" href=\"{}\">\n",
            escape_attr(stylesheet)
        ));
    }
    out.push_str("</head>\n");
    out
}

pub fn main_preamble(layout: &BookLayout) -> String {
    let mut out = head("Main text", layout);
    out.push_str(&format!(
        "<body>\n<div class=\"{}\">\n",
        escape_attr(&layout.main_container_class)
    ));
    out
}

pub fn toc_preamble(layout: &BookLayout) -> String {
    let mut out = head("TOC", layout);
    out.push_str("<body>\n");
    out
}

pub fn index_document(title: &str, layout: &BookLayout) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n\
<frameset cols=\"20%,*\">\n\
<frame src=\"{toc}\" name=\"{toc_frame}\">\n\
<frame src=\"{main}\" name=\"{text_frame}\">\n\
</frameset>\n</html>\n",
        title = escape_text(title),
        toc = escape_attr(&layout.toc_file),
        toc_frame = escape_attr(&layout.toc_frame),
        main = escape_attr(&layout.main_file),
        text_frame = escape_attr(&layout.text_frame),
    )
}

pub fn write_index(out_dir: &Path, title: &str, layout: &BookLayout) -> anyhow::Result<()> {
    let path = out_dir.join(&layout.index_file);
    let mut file = create_new(&path)?;
    file.write_all(index_document(title, layout).as_bytes())
        .with_context(|| format!("write index: {}", path.display()))?;
    file.flush()
        .with_context(|| format!("flush index: {}", path.display()))?;
    Ok(())
}
