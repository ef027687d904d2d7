use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use serde::Serialize;
use url::Url;

use crate::anomaly::Anomaly;
use crate::cli::TransformArgs;
use crate::config::{BookLayout, Config, ReaderProfile};
use crate::dom::{self, Element, Node};
use crate::ids::{HeadingIdGenerator, RandomHeadingIds, SequentialHeadingIds};
use crate::images::{ImageResolver, ManifestEntry};

/// One line of the TOC document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub heading_id: String,
    pub text: String,
}

impl TocEntry {
    pub fn anchor_id(&self) -> String {
        toc_anchor_id(&self.heading_id)
    }

    pub fn to_html(&self, layout: &BookLayout) -> String {
        format!(
            "<p class=\"h{level}\"><a id=\"{anchor}\" href=\"{main}#{id}\" target=\"{frame}\">{text}</a></p>\n",
            level = self.level,
            anchor = dom::escape_attr(&self.anchor_id()),
            main = dom::escape_attr(&layout.main_file),
            id = dom::escape_attr(&self.heading_id),
            frame = dom::escape_attr(&layout.text_frame),
            text = dom::escape_text(&self.text),
        )
    }
}

pub fn toc_anchor_id(heading_id: &str) -> String {
    format!("{heading_id}-TOC")
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransformedChapter {
    pub fragment: String,
    pub toc_entries: Vec<TocEntry>,
    pub images: Vec<ManifestEntry>,
    pub anomalies: Vec<Anomaly>,
}

impl TransformedChapter {
    pub fn toc_html(&self, layout: &BookLayout) -> String {
        self.toc_entries
            .iter()
            .map(|entry| entry.to_html(layout))
            .collect()
    }

    pub fn manifest_text(&self) -> String {
        self.images.iter().map(ToString::to_string).collect()
    }
}

/// Turns one chapter of reader markup into portable HTML plus its TOC entries.
#[derive(Debug, Clone)]
pub struct ChapterTransformer {
    profile: ReaderProfile,
    layout: BookLayout,
    images: ImageResolver,
}

impl ChapterTransformer {
    /// `image_dir` is the `dir=` value written to the manifest.
    pub fn new(profile: ReaderProfile, layout: BookLayout, image_dir: impl Into<String>) -> Self {
        let images = ImageResolver::new(image_dir, layout.image_folder.clone());
        Self {
            profile,
            layout,
            images,
        }
    }

    /// The input markup is never mutated; the returned fragment is serialized
    /// from a detached tree. `ids` is consulted only for headings without an id.
    pub fn transform(
        &self,
        markup: &str,
        ids: &mut dyn HeadingIdGenerator,
    ) -> TransformedChapter {
        let mut out = TransformedChapter::default();

        let nodes = dom::parse_fragment(markup);
        let nodes = self.remove_noise(nodes);
        let mut nodes = self.unwrap_decorative(nodes);
        self.rewrite_raster_images(&mut nodes, &mut out);
        self.rewrite_vector_images(&mut nodes, &mut out);
        rewrite_internal_links(&mut nodes);
        let nodes = self.promote_headings(nodes, ids, &mut out);

        out.fragment = dom::serialize(&nodes);
        out
    }

    fn remove_noise(&self, nodes: Vec<Node>) -> Vec<Node> {
        nodes
            .into_iter()
            .filter_map(|node| match node {
                Node::Element(element)
                    if element.name == self.profile.noise_tag
                        && element.has_class(&self.profile.noise_class) =>
                {
                    None
                }
                Node::Element(mut element) => {
                    element.children = self.remove_noise(element.children);
                    Some(Node::Element(element))
                }
                other => Some(other),
            })
            .collect()
    }

    fn unwrap_decorative(&self, nodes: Vec<Node>) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Element(mut element) => {
                    element.children = self.unwrap_decorative(element.children);
                    if self.profile.unwrap_tags.contains(&element.name) {
                        out.extend(element.children);
                    } else {
                        out.push(Node::Element(element));
                    }
                }
                other => out.push(other),
            }
        }
        out
    }

    fn rewrite_raster_images(&self, nodes: &mut [Node], out: &mut TransformedChapter) {
        let lazy_attr = self.profile.lazy_src_attr.as_str();
        dom::for_each_element_mut(nodes, &mut |element| {
            if element.name != "img" {
                return;
            }
            let Some(raw_url) = element.attr(lazy_attr).map(str::to_owned) else {
                return;
            };
            let Some(local_path) = self.resolve_image(&raw_url, out) else {
                return;
            };

            element.set_attr("src", local_path);
            element.remove_attr(lazy_attr);
            for attr in &self.profile.strip_image_attrs {
                element.remove_attr(attr);
            }
            element.attrs.retain(|(name, _)| !name.starts_with("data-"));
        });
    }

    fn rewrite_vector_images(&self, nodes: &mut [Node], out: &mut TransformedChapter) {
        dom::for_each_element_mut(nodes, &mut |element| {
            if element.name != "image" {
                return;
            }
            let Some(raw_url) = element.attr("xlink:href").map(str::to_owned) else {
                return;
            };
            if let Some(local_path) = self.resolve_image(&raw_url, out) {
                element.set_attr("xlink:href", local_path);
            }
        });
    }

    fn resolve_image(&self, raw_url: &str, out: &mut TransformedChapter) -> Option<String> {
        match self.images.resolve(raw_url) {
            Some(resolved) => {
                out.images.push(resolved.entry);
                Some(resolved.local_path)
            }
            None => {
                out.anomalies.push(Anomaly::ImageWithoutFilename {
                    url: raw_url.to_owned(),
                });
                None
            }
        }
    }

    fn promote_headings(
        &self,
        nodes: Vec<Node>,
        ids: &mut dyn HeadingIdGenerator,
        out: &mut TransformedChapter,
    ) -> Vec<Node> {
        let mut promoted = Vec::with_capacity(nodes.len());
        for node in nodes {
            let mut element = match node {
                Node::Element(element) => element,
                other => {
                    promoted.push(other);
                    continue;
                }
            };
            match self.heading_level(&element) {
                Some(level) => {
                    promoted.push(Node::Element(self.promote_heading(element, level, ids, out)));
                }
                None => {
                    let children = std::mem::take(&mut element.children);
                    element.children = self.promote_headings(children, ids, out);
                    promoted.push(Node::Element(element));
                }
            }
        }
        promoted
    }

    fn heading_level(&self, element: &Element) -> Option<u8> {
        if let Some(level) = heading_level_from_name(&element.name) {
            return Some(level);
        }
        if element.name != self.profile.heading_container_tag {
            return None;
        }
        element.classes().find_map(heading_level_from_name)
    }

    fn promote_heading(
        &self,
        mut heading: Element,
        level: u8,
        ids: &mut dyn HeadingIdGenerator,
        out: &mut TransformedChapter,
    ) -> Element {
        let text = heading.text();
        let authored = heading
            .remove_attr("id")
            .filter(|id| !id.trim().is_empty());
        let heading_id = match authored {
            Some(id) => id,
            None => {
                let synthesized = ids.generate();
                out.anomalies.push(Anomaly::MissingHeadingId {
                    level,
                    text: text.clone(),
                    synthesized_id: synthesized.clone(),
                });
                synthesized
            }
        };

        let anchor = Element::new("a")
            .with_attr(
                "href",
                format!("{}#{}", self.layout.toc_file, toc_anchor_id(&heading_id)),
            )
            .with_attr("target", self.layout.toc_frame.clone())
            .with_attr("id", heading_id.clone())
            .with_children(heading.children);

        out.toc_entries.push(TocEntry {
            level,
            heading_id,
            text,
        });

        Element::new(format!("h{level}")).with_children(vec![Node::Element(anchor)])
    }
}

fn heading_level_from_name(name: &str) -> Option<u8> {
    let digit = name.strip_prefix('h')?;
    match digit {
        "1" | "2" | "3" | "4" | "5" | "6" => digit.parse().ok(),
        _ => None,
    }
}

fn rewrite_internal_links(nodes: &mut [Node]) {
    dom::for_each_element_mut(nodes, &mut |element| {
        if element.name != "a" {
            return;
        }
        let Some(href) = element.attr("href") else {
            return;
        };
        if let Some(rewritten) = same_document_href(href) {
            element.set_attr("href", rewritten);
        }
    });
}

/// `chap01.html#Foo.Bar` becomes `#FooBar`; absolute and scheme-relative URLs
/// and hrefs without a fragment are left alone.
pub fn same_document_href(href: &str) -> Option<String> {
    let (_, fragment) = href.split_once('#')?;
    if href.trim_start().starts_with("//") || Url::parse(href).is_ok() {
        return None;
    }
    let token = fragment.replace(['#', '.'], "");
    Some(format!("#{token}"))
}

pub fn run(args: TransformArgs) -> anyhow::Result<()> {
    let config = Config::load(args.config.as_deref().map(std::path::Path::new))
        .context("load config")?;
    let input = PathBuf::from(&args.input);
    let markup = std::fs::read_to_string(&input)
        .with_context(|| format!("read chapter: {}", input.display()))?;

    let image_dir = args
        .image_dir
        .clone()
        .unwrap_or_else(|| config.layout.image_folder.clone());
    let transformer = ChapterTransformer::new(config.reader, config.layout, image_dir);

    let chapter = if args.sequential_ids {
        transformer.transform(&markup, &mut SequentialHeadingIds::default())
    } else {
        transformer.transform(&markup, &mut RandomHeadingIds)
    };
    for anomaly in &chapter.anomalies {
        anomaly.log(None);
    }

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &chapter).context("serialize chapter")?;
    stdout.write_all(b"\n").context("write stdout newline")?;
    stdout.flush().context("flush stdout")?;
    Ok(())
}
