//! Deterministic module synthesis without any model call.
//!
//! Works from the structure the HTML conversion leaves in the text:
//! `#` headings first, then `- ` list items, then plain prose cut into
//! fixed-size chunks. With no text at all it returns a single placeholder
//! module built from the URL.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::text::{first_sentence, sentences};
use crate::types::config::FallbackConfig;
use crate::types::module::Module;

const NAME_MAX_CHARS: usize = 80;
const DESCRIPTION_MAX_CHARS: usize = 240;

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").unwrap();
    static ref LIST_ITEM: Regex = Regex::new(r"^(?:[-*+•]|\d{1,3}[.)])\s+(.+)$").unwrap();
    static ref MARKUP: Regex = Regex::new(r"\[([^\]]*)\]\([^)]*\)|[*_`]+").unwrap();
    static ref ITEM_SEPARATOR: Regex = Regex::new(r"\s*(?::|\s[-–—]\s)\s*").unwrap();
}

/// Sections listed in a placeholder when the URL carries a hint.
const HELP_SECTIONS: &[(&str, &str)] = &[
    ("Getting Started", "Basic setup and initial configuration guide"),
    ("Account Management", "User account creation, settings, and profile management"),
    ("Features Overview", "Core features and functionality explanation"),
    ("Troubleshooting", "Common issues and their solutions"),
    ("Contact Support", "How to reach customer support and get assistance"),
];

const SUPPORT_SECTIONS: &[(&str, &str)] = &[
    ("Technical Support", "Technical issues, bugs, and system problems"),
    ("Billing & Payments", "Payment issues, billing questions, and subscription management"),
    ("Account Recovery", "Password reset, account access, and security issues"),
    ("Feature Requests", "Suggest new features and improvements"),
    ("Documentation", "User guides, tutorials, and reference materials"),
];

const DOCS_SECTIONS: &[(&str, &str)] = &[
    ("API Documentation", "Complete API reference and integration guides"),
    ("Developer Tools", "SDKs, libraries, and development resources"),
    ("Getting Started Guide", "Quick start tutorial and basic setup"),
    ("Advanced Features", "Advanced functionality and configuration options"),
    ("Examples & Tutorials", "Code examples and step-by-step tutorials"),
];

/// Sections for a host-keyword match with no better path hint.
const HOSTED_DOCS_SECTIONS: &[(&str, &str)] = &[
    ("User Guide", "Comprehensive user documentation and guides"),
    ("FAQ", "Frequently asked questions and common solutions"),
    ("Getting Started", "Initial setup and basic usage instructions"),
    ("Advanced Features", "Advanced functionality and configuration"),
    ("Contact Support", "Customer support and assistance options"),
];

const DISCORD_SECTIONS: &[(&str, &str)] = &[
    ("Server Management", "Create and manage Discord servers, channels, and permissions"),
    ("User Settings", "Customize your Discord profile, privacy, and notification settings"),
    ("Voice & Video", "Use voice channels, video calls, and screen sharing features"),
    ("Text Messaging", "Send messages, use emojis, and manage conversations"),
    ("Bots & Integrations", "Add bots and integrate third-party services with Discord"),
];

const INSTAGRAM_SECTIONS: &[(&str, &str)] = &[
    ("Account Management", "Manage your Instagram profile, privacy settings, and account security"),
    ("Content Creation", "Create and share posts, stories, reels, and IGTV videos"),
    ("Social Features", "Follow users, like posts, comment, and use direct messaging"),
    ("Business Tools", "Instagram for Business features, analytics, and advertising"),
    ("Safety & Privacy", "Block users, report content, and manage privacy settings"),
];

const NEO_SECTIONS: &[(&str, &str)] = &[
    ("Workspace Management", "Create and organize your Neo workspace and projects"),
    ("Collaboration Tools", "Share files, collaborate with team members, and manage permissions"),
    ("File Organization", "Upload, organize, and manage files and folders"),
    ("Integration Features", "Connect with external tools and services"),
    ("Account Settings", "Manage your Neo account, billing, and preferences"),
];

const GITHUB_SECTIONS: &[(&str, &str)] = &[
    ("Repository Management", "Create, clone, and manage Git repositories"),
    ("Code Collaboration", "Pull requests, code reviews, and branch management"),
    ("Issue Tracking", "Create and manage issues, bugs, and feature requests"),
    ("Actions & CI/CD", "Automated workflows and continuous integration"),
    ("Project Management", "Project boards, milestones, and team collaboration"),
];

/// Curated sections for well-known sites, matched on the registrable host
/// or any of its subdomains. Checked before any other hint.
const KNOWN_HOSTS: &[(&str, &[(&str, &str)])] = &[
    ("discord.com", DISCORD_SECTIONS),
    ("instagram.com", INSTAGRAM_SECTIONS),
    ("neo.space", NEO_SECTIONS),
    ("github.com", GITHUB_SECTIONS),
];

/// Path segments mapped to the sections they suggest, first match wins.
///
/// No `api` entry: `/api/` paths are screened out before fetching.
const PATH_HINTS: &[(&str, &[(&str, &str)])] = &[
    ("help", HELP_SECTIONS),
    ("support", SUPPORT_SECTIONS),
    ("faq", HELP_SECTIONS),
    ("kb", HELP_SECTIONS),
    ("docs", DOCS_SECTIONS),
    ("documentation", DOCS_SECTIONS),
    ("developer", DOCS_SECTIONS),
    ("guide", DOCS_SECTIONS),
    ("manual", DOCS_SECTIONS),
    ("reference", DOCS_SECTIONS),
];

/// Host labels that mark a documentation site.
const HOST_HINTS: &[&str] = &[
    "help",
    "support",
    "docs",
    "documentation",
    "developer",
    "developers",
    "api",
    "kb",
];

/// Synthesized structure plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub modules: Vec<Module>,

    /// Built without any page text
    pub synthetic: bool,

    /// For placeholders: the URL supplied hints, so the structure says
    /// something beyond "there is a site here"
    pub informative: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Line<'a> {
    Heading(usize, String),
    Item(String),
    Prose(&'a str),
    Blank,
}

fn classify(line: &str) -> Line<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    if let Some(caps) = HEADING.captures(line) {
        let name = clean(&caps[2]);
        return if name.is_empty() { Line::Blank } else { Line::Heading(caps[1].len(), name) };
    }
    if let Some(caps) = LIST_ITEM.captures(line) {
        let item = clean(&caps[1]);
        return if item.is_empty() { Line::Blank } else { Line::Item(item) };
    }
    Line::Prose(line)
}

fn known_host_sections(host: &str) -> Option<&'static [(&'static str, &'static str)]> {
    KNOWN_HOSTS
        .iter()
        .find(|(domain, _)| {
            host == *domain
                || host
                    .strip_suffix(*domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .map(|(_, sections)| *sections)
}

/// Alphanumeric runs of a host or path.
fn segments(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_alphanumeric()).filter(|s| !s.is_empty())
}

/// Strip link targets and emphasis markers.
fn clean(text: &str) -> String {
    MARKUP
        .replace_all(text, "$1")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derives modules from raw text with no AI dependency.
#[derive(Debug, Clone, Default)]
pub struct FallbackSynthesizer {
    config: FallbackConfig,
}

impl FallbackSynthesizer {
    pub fn new(config: FallbackConfig) -> Self {
        Self { config }
    }

    /// Build a non-empty module list for `text`, or a placeholder from
    /// `url` when there is no usable text. Same input, same output.
    pub fn synthesize(&self, url: &str, text: &str) -> Synthesis {
        let lines: Vec<Line<'_>> = text.lines().map(classify).collect();

        let modules = Some(self.from_headings(&lines))
            .filter(|m| !m.is_empty())
            .or_else(|| Some(self.from_lists(url, &lines)).filter(|m| !m.is_empty()))
            .or_else(|| Some(self.from_prose(&lines)).filter(|m| !m.is_empty()));

        match modules {
            Some(modules) => Synthesis {
                modules,
                synthetic: false,
                informative: true,
            },
            None => self.placeholder(url),
        }
    }

    /// Placeholder for a URL that produced no text.
    ///
    /// Sections come from the curated host table, then from path segment
    /// hints, then from documentation-like host labels. With none of these
    /// the placeholder is a lone "Overview" and is not informative.
    pub fn placeholder(&self, url: &str) -> Synthesis {
        let parsed = Url::parse(url).ok();
        let host = site_name(url);
        let full_host = parsed
            .as_ref()
            .and_then(|u| u.host_str())
            .unwrap_or_default()
            .to_lowercase();
        let path = parsed.as_ref().map(|u| u.path().to_lowercase()).unwrap_or_default();

        let sections = known_host_sections(&full_host)
            .or_else(|| {
                PATH_HINTS
                    .iter()
                    .find(|(hint, _)| segments(&path).any(|segment| segment == *hint))
                    .map(|(_, sections)| *sections)
            })
            .or_else(|| {
                segments(&full_host)
                    .any(|label| HOST_HINTS.contains(&label))
                    .then_some(HOSTED_DOCS_SECTIONS)
            });

        let mut module = Module::new(
            format!("{} Documentation", host),
            format!("Placeholder structure for {}; no page content could be retrieved.", url),
        )
        .synthetic();

        match sections {
            Some(sections) => {
                for (name, description) in sections {
                    module.insert_submodule(*name, *description);
                }
            }
            None => {
                module.insert_submodule("Overview", format!("General information published at {}.", host));
            }
        }

        Synthesis {
            modules: vec![module],
            synthetic: true,
            informative: sections.is_some(),
        }
    }

    fn from_headings(&self, lines: &[Line<'_>]) -> Vec<Module> {
        let Some(top) = lines
            .iter()
            .filter_map(|l| match l {
                Line::Heading(level, _) => Some(*level),
                _ => None,
            })
            .min()
        else {
            return Vec::new();
        };

        let mut drafts: Vec<Draft> = Vec::new();
        for line in lines {
            match line {
                Line::Heading(level, name) if *level == top => drafts.push(Draft::new(name)),
                Line::Heading(_, name) => {
                    if let Some(draft) = drafts.last_mut() {
                        draft.children.push((name.clone(), None));
                        draft.in_child = true;
                    }
                }
                Line::Item(item) => {
                    if let Some(draft) = drafts.last_mut() {
                        let (name, description) = split_item(item);
                        draft.children.push((name, description));
                    }
                }
                Line::Prose(prose) => {
                    if let Some(draft) = drafts.last_mut() {
                        draft.add_prose(prose);
                    }
                }
                Line::Blank => {}
            }
        }

        drafts
            .into_iter()
            .take(self.config.max_modules.max(1))
            .map(|d| d.finish(self.config.max_submodules))
            .collect()
    }

    fn from_lists(&self, url: &str, lines: &[Line<'_>]) -> Vec<Module> {
        let items: Vec<&String> = lines
            .iter()
            .filter_map(|l| match l {
                Line::Item(item) => Some(item),
                _ => None,
            })
            .collect();
        if items.is_empty() {
            return Vec::new();
        }

        let first_prose = lines.iter().find_map(|l| match l {
            Line::Prose(p) => Some(*p),
            _ => None,
        });
        let name = first_prose
            .filter(|p| p.chars().count() <= NAME_MAX_CHARS)
            .map(|p| p.trim_end_matches(&['.', ':'][..]).trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| format!("{} Documentation", site_name(url)));

        let mut draft = Draft::new(&name);
        if let Some(p) = first_prose {
            draft.add_prose(p);
        }
        for item in items {
            draft.children.push(split_item(item));
        }
        vec![draft.finish(self.config.max_submodules)]
    }

    fn from_prose(&self, lines: &[Line<'_>]) -> Vec<Module> {
        let prose: Vec<&str> = lines
            .iter()
            .filter_map(|l| match l {
                Line::Prose(p) => Some(*p),
                _ => None,
            })
            .collect();
        let body = prose.join(" ");
        let all = sentences(&body);
        if all.is_empty() {
            return Vec::new();
        }

        let chunk_words = self.config.chunk_words.max(1);
        let mut chunks: Vec<Vec<&str>> = vec![Vec::new()];
        let mut words_in_chunk = 0;
        for sentence in all {
            if words_in_chunk >= chunk_words {
                chunks.push(Vec::new());
                words_in_chunk = 0;
            }
            words_in_chunk += sentence.split_whitespace().count();
            if let Some(chunk) = chunks.last_mut() {
                chunk.push(sentence);
            }
        }

        chunks
            .into_iter()
            .filter(|c| !c.is_empty())
            .take(self.config.max_modules.max(1))
            .enumerate()
            .map(|(i, chunk)| {
                let mut module = Module::new(
                    format!("Topic {}", i + 1),
                    first_sentence(chunk[0], DESCRIPTION_MAX_CHARS),
                );
                for (j, sentence) in chunk.iter().take(self.config.max_submodules.max(1)).enumerate() {
                    module.insert_submodule(format!("Part {}", j + 1), first_sentence(sentence, DESCRIPTION_MAX_CHARS));
                }
                module
            })
            .collect()
    }
}

/// Module under construction.
struct Draft {
    name: String,
    description: Option<String>,
    children: Vec<(String, Option<String>)>,
    /// Prose now belongs to the last child rather than the module
    in_child: bool,
}

impl Draft {
    fn new(name: &str) -> Self {
        Self {
            name: first_sentence(name, NAME_MAX_CHARS),
            description: None,
            children: Vec::new(),
            in_child: false,
        }
    }

    fn add_prose(&mut self, prose: &str) {
        let summary = first_sentence(prose, DESCRIPTION_MAX_CHARS);
        if summary.is_empty() {
            return;
        }
        if self.in_child {
            if let Some((_, description @ None)) = self.children.last_mut() {
                *description = Some(summary);
            }
        } else if self.description.is_none() {
            self.description = Some(summary);
        }
    }

    fn finish(self, max_submodules: usize) -> Module {
        let description = self
            .description
            .unwrap_or_else(|| format!("Documentation section covering {}.", self.name));
        let mut module = Module::new(self.name, description);

        for (name, child_description) in self.children {
            if module.submodules.len() >= max_submodules.max(1) {
                break;
            }
            let child_description =
                child_description.unwrap_or_else(|| format!("Details about {} within {}.", name, module.name));
            module.insert_submodule(name, child_description);
        }

        if module.submodules.is_empty() {
            let overview = module.description.clone();
            module.insert_submodule("Overview", overview);
        }
        module
    }
}

/// Host without `www.`, or "Site" when the URL has none.
fn site_name(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "Site".to_string())
}

/// Split `Name: description` or `Name - description` list items.
fn split_item(item: &str) -> (String, Option<String>) {
    if let Some(m) = ITEM_SEPARATOR.find(item) {
        let name = item[..m.start()].trim();
        let rest = item[m.end()..].trim();
        if !name.is_empty() && !rest.is_empty() && name.chars().count() <= NAME_MAX_CHARS {
            return (name.to_string(), Some(first_sentence(rest, DESCRIPTION_MAX_CHARS)));
        }
    }
    if item.chars().count() <= NAME_MAX_CHARS {
        (item.to_string(), None)
    } else {
        let name: Vec<&str> = item.split_whitespace().take(6).collect();
        (name.join(" "), Some(first_sentence(item, DESCRIPTION_MAX_CHARS)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn synth() -> FallbackSynthesizer {
        FallbackSynthesizer::default()
    }

    #[test]
    fn test_headings_become_modules() {
        let text = "# Getting Started\n\nSet up the tool in minutes.\n\n## Install\n\nDownload the binary.\n\n\
                    ## Configure\n\n# Billing\n\n- Invoices: Monthly statements\n- Refunds";

        let result = synth().synthesize("https://docs.example.com", text);

        assert!(!result.synthetic);
        assert_eq!(result.modules.len(), 2);

        let start = &result.modules[0];
        assert_eq!(start.name, "Getting Started");
        assert_eq!(start.description, "Set up the tool in minutes.");
        assert_eq!(start.submodules["Install"], "Download the binary.");
        assert_eq!(start.submodules["Configure"], "Details about Configure within Getting Started.");

        let billing = &result.modules[1];
        assert_eq!(billing.submodules["Invoices"], "Monthly statements");
        assert!(billing.submodules.contains_key("Refunds"));
        assert!(result.modules.iter().all(Module::is_well_formed));
    }

    #[test]
    fn test_heading_without_children_gets_overview() {
        let result = synth().synthesize("https://docs.example.com", "## Changelog\n\nRelease notes for each version.");
        let module = &result.modules[0];
        assert_eq!(module.name, "Changelog");
        assert_eq!(module.submodules["Overview"], "Release notes for each version.");
    }

    #[test]
    fn test_lists_without_headings() {
        let text = "Product Guide\n- Dashboards: Build charts\n- Alerts - Get notified\n- Exports";
        let result = synth().synthesize("https://docs.example.com", text);

        assert_eq!(result.modules.len(), 1);
        let module = &result.modules[0];
        assert_eq!(module.name, "Product Guide");
        let names: Vec<_> = module.submodules.keys().cloned().collect();
        assert_eq!(names, vec!["Dashboards", "Alerts", "Exports"]);
        assert_eq!(module.submodules["Alerts"], "Get notified");
    }

    #[test]
    fn test_prose_is_chunked() {
        let sentence = "The scheduler assigns work to idle nodes in the cluster. ";
        let text = sentence.repeat(40);
        let synth = FallbackSynthesizer::new(FallbackConfig {
            chunk_words: 30,
            max_modules: 3,
            max_submodules: 4,
        });

        let result = synth.synthesize("https://docs.example.com", &text);

        assert_eq!(result.modules.len(), 3);
        assert_eq!(result.modules[0].name, "Topic 1");
        assert_eq!(result.modules[2].name, "Topic 3");
        assert!(result.modules.iter().all(|m| m.submodules.len() <= 4));
        assert!(result.modules[0].submodules.contains_key("Part 1"));
    }

    #[test]
    fn test_empty_text_gives_informative_placeholder_for_help_url() {
        let result = synth().synthesize("https://help.acme.io/hc/en-us", "   ");

        assert!(result.synthetic);
        assert!(result.informative);
        let module = &result.modules[0];
        assert!(module.synthetic);
        assert_eq!(module.name, "help.acme.io Documentation");
        let names: Vec<_> = module.submodules.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            ["User Guide", "FAQ", "Getting Started", "Advanced Features", "Contact Support"]
        );
    }

    #[test]
    fn test_path_hint_beats_host_label() {
        let result = synth().placeholder("https://docs.acme.io/help/billing");
        assert!(result.informative);
        assert!(result.modules[0].submodules.contains_key("Troubleshooting"));
    }

    #[test]
    fn test_known_hosts_get_curated_sections() {
        let cases = [
            ("https://support.discord.com/hc/en-us", "Server Management"),
            ("https://help.instagram.com/", "Content Creation"),
            ("https://www.neo.space/", "Workspace Management"),
            ("https://github.com/features", "Issue Tracking"),
            ("https://docs.github.com/en/help", "Actions & CI/CD"),
        ];
        for (url, expected) in cases {
            let result = synth().placeholder(url);
            assert!(result.synthetic, "{url}");
            assert!(result.informative, "{url}");
            let module = &result.modules[0];
            assert_eq!(module.submodules.len(), 5, "{url}");
            assert!(module.submodules.contains_key(expected), "{url}: {:?}", module.submodules);
            assert!(module.is_well_formed());
        }
    }

    #[test]
    fn test_known_host_needs_label_boundary() {
        let result = synth().placeholder("https://notgithub.com/");
        assert!(!result.informative);
        assert!(!result.modules[0].submodules.contains_key("Issue Tracking"));
    }

    #[test]
    fn test_empty_text_gives_uninformative_placeholder() {
        let result = synth().synthesize("https://www.acme.io/", "");

        assert!(result.synthetic);
        assert!(!result.informative);
        assert_eq!(result.modules[0].name, "acme.io Documentation");
        assert_eq!(result.modules[0].submodules.len(), 1);
        assert!(result.modules[0].is_well_formed());
    }

    #[test]
    fn test_hint_must_be_a_whole_segment() {
        // "rapid" contains "api" but is not an API host label
        let result = synth().placeholder("https://rapid.example.com/");
        assert!(!result.informative);

        let result = synth().placeholder("https://api.example.com/v2");
        assert!(result.informative);
        assert!(result.modules[0].submodules.contains_key("User Guide"));

        let result = synth().placeholder("https://example.com/guidebook");
        assert!(!result.informative);
    }

    #[test]
    fn test_garbage_url_still_yields_module() {
        let result = synth().synthesize("not a url", "");
        assert_eq!(result.modules[0].name, "Site Documentation");
        assert!(result.modules[0].is_well_formed());
    }

    proptest! {
        #[test]
        fn prop_never_empty_and_well_formed(text in "(#{0,3} ?[a-zA-Z .:\\-*]{0,40}\n){0,12}") {
            let result = synth().synthesize("https://docs.example.com/guide", &text);
            prop_assert!(!result.modules.is_empty());
            prop_assert!(result.modules.iter().all(Module::is_well_formed));
        }

        #[test]
        fn prop_deterministic(text in "[a-zA-Z .#\\-\n]{0,300}") {
            let a = synth().synthesize("https://docs.example.com", &text);
            let b = synth().synthesize("https://docs.example.com", &text);
            prop_assert_eq!(a, b);
        }
    }
}
