// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use crate::*;
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

// Helper to build an engine from (name, source) pairs
fn engine_with(units: &[(&str, &str)]) -> ViewEngine {
    let engine = ViewEngine::new();
    for (name, source) in units {
        engine.register(name, source).unwrap();
    }
    engine
}

fn render(engine: &ViewEngine, name: &str, data: Value) -> String {
    engine.render_to_string(name, &data).unwrap()
}

// Helper to write template files into a fresh temp directory
fn views_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

#[cfg(test)]
mod master_page_tests {
    use super::*;

    const MASTER: &str = "<html>\n\t<body>\n\t\t{{template \"__body\"}}\n\t</body>\n</html>";

    #[test]
    fn test_simple_master_page() {
        let engine = engine_with(&[
            ("masterpage", MASTER),
            (
                "homepage",
                "{{define \"__body\"}}<p>Page content here.</p>{{end}}\n{{template \"masterpage\"}}",
            ),
        ]);

        assert_eq!(
            render(&engine, "homepage", json!(null)),
            "\n<html>\n\t<body>\n\t\t<p>Page content here.</p>\n\t</body>\n</html>"
        );
    }

    #[test]
    fn test_master_page_with_includes() {
        let engine = engine_with(&[
            (
                "masterpage",
                "<html>\n\t<body>\n\t\t{{template \"__body\"}}\n\t\t{{template \"snippet\"}}\n\t</body>\n</html>",
            ),
            (
                "homepage",
                "{{define \"__body\"}}<p>Page content here. {{template \"snippet\"}}</p>{{end}}\n{{template \"masterpage\"}}",
            ),
            // Registered after the page that uses it: lookups happen at render time.
            ("snippet", "SNIPPET"),
        ]);

        assert_eq!(
            render(&engine, "homepage", json!(null)),
            "\n<html>\n\t<body>\n\t\t<p>Page content here. SNIPPET</p>\n\t\tSNIPPET\n\t</body>\n</html>"
        );
    }

    #[test]
    fn test_nested_master_page() {
        let engine = engine_with(&[
            ("masterpage_top", MASTER),
            (
                "masterpage_inner",
                "{{define \"__body\"}}<h1>Common Header</h1>\n\t{{template \"__body\"}}{{end}}\n{{template \"masterpage_top\"}}",
            ),
            (
                "homepage",
                "{{define \"__body\"}}<p>Page content here.</p>{{end}}\n{{template \"masterpage_inner\"}}",
            ),
        ]);

        assert!(engine.is_page("masterpage_inner"));
        assert_eq!(
            render(&engine, "homepage", json!(null)),
            "\n\n<html>\n\t<body>\n\t\t<h1>Common Header</h1>\n\t<p>Page content here.</p>\n\t</body>\n</html>"
        );
    }

    #[test]
    fn test_master_chain_of_three_levels() {
        let engine = engine_with(&[
            ("a", "<a>{{template \"__body\"}}</a>"),
            ("b", "{{define \"__body\"}}<b>{{template \"__body\"}}</b>{{end}}{{template \"a\"}}"),
            ("c", "{{define \"__body\"}}<c>{{template \"__body\"}}</c>{{end}}{{template \"b\"}}"),
            ("content", "{{define \"__body\"}}text{{end}}{{template \"c\"}}"),
        ]);

        assert_eq!(render(&engine, "content", json!(null)), "<a><b><c>text</c></b></a>");
        // Rendered directly, "b" is the innermost level and fills its own section.
        assert_eq!(
            engine_with(&[
                ("a", "<a>{{template \"__body\"}}</a>"),
                ("b", "{{define \"__body\"}}<b>{{optional \"__inner\"}}</b>{{end}}{{template \"a\"}}"),
            ])
            .render_to_string("b", &json!(null))
            .unwrap(),
            "<a><b></b></a>"
        );
    }

    #[test]
    fn test_optional_sections() {
        let engine = engine_with(&[
            (
                "masterpage",
                "<html>\n\t<body>\n\t\t{{optional_template \"__header\"}}\n\t\t{{template \"__body\"}}\n\t\t{{optional_template \"__footer\"}}\n\t</body>\n</html>",
            ),
            (
                "homepage",
                "{{define \"__body\"}}<p>Page content here.</p>{{end}}\n{{define \"__header\"}}<h1>Page header</h1>{{end}}\n{{template \"masterpage\"}}",
            ),
        ]);

        assert_eq!(
            render(&engine, "homepage", json!(null)),
            "\n\n<html>\n\t<body>\n\t\t<h1>Page header</h1>\n\t\t<p>Page content here.</p>\n\t\t\n\t</body>\n</html>"
        );
    }

    #[test]
    fn test_data_binding() {
        let engine = engine_with(&[
            (
                "masterpage",
                "<html>\n\t<body>\n\t\t{{template \"__body\" .}}\n\t\t{{.}}\n\t</body>\n</html>",
            ),
            (
                "homepage",
                "{{define \"__body\"}}<p>Page content here. {{.}}</p>{{end}}\n{{.}}\n{{template \"masterpage\" .}}\n{{.}}",
            ),
        ]);

        assert_eq!(
            render(&engine, "homepage", json!("DATA")),
            "\nDATA\n<html>\n\t<body>\n\t\t<p>Page content here. DATA</p>\n\t\tDATA\n\t</body>\n</html>\nDATA"
        );
    }

    #[test]
    fn test_root_data_reaches_sections() {
        let engine = engine_with(&[
            ("layout", "<title>{{.title}}</title>{{template \"__body\" .}}"),
            (
                "page",
                "{{define \"__body\"}}{{range .items}}<li>{{.}}/{{$.title}}</li>{{end}}{{end}}{{template \"layout\" .}}",
            ),
        ]);

        let out = render(&engine, "page", json!({"title": "T", "items": ["a", "b"]}));
        assert_eq!(out, "<title>T</title><li>a/T</li><li>b/T</li>");
    }

    #[test]
    fn test_minimal_page() {
        let engine = engine_with(&[
            ("masterpage", "<x>{{template \"__body\"}}</x>"),
            ("homepage", "{{define \"__body\"}}hi{{end}}{{template \"masterpage\"}}"),
        ]);
        let out = render(&engine, "homepage", json!(null));
        assert_eq!(out, "<x>hi</x>");
        assert!(!out.contains("__"));
    }

    #[test]
    fn test_optional_undeclared_section_is_empty() {
        let engine = engine_with(&[
            ("masterpage", "<x>{{optional \"__sidebar\"}}{{template \"__body\"}}</x>"),
            ("homepage", "{{define \"__body\"}}hi{{end}}{{template \"masterpage\"}}"),
        ]);
        assert_eq!(render(&engine, "homepage", json!(null)), "<x>hi</x>");
    }

    #[test]
    fn test_required_section_missing_is_runtime_error() {
        let engine = engine_with(&[
            ("masterpage", "<x>{{template \"__footer\"}}</x>"),
            ("homepage", "{{define \"__body\"}}hi{{end}}{{template \"masterpage\"}}"),
        ]);

        let mut out = Vec::new();
        let err = engine.render(&mut out, "homepage", &json!(null)).unwrap_err();
        assert!(matches!(err, ViewError::Runtime { ref template, .. } if template == "masterpage"));
        // Output flushed before the failure is not rolled back.
        assert_eq!(out, b"<x>");
    }

    #[test]
    fn test_pages_share_section_names() {
        let engine = engine_with(&[
            ("layout", "[{{template \"__body\"}}]"),
            ("one", "{{define \"__body\"}}1{{end}}{{template \"layout\"}}"),
            ("two", "{{define \"__body\"}}2{{end}}{{template \"layout\"}}"),
        ]);
        assert_eq!(render(&engine, "one", json!(null)), "[1]");
        assert_eq!(render(&engine, "two", json!(null)), "[2]");
        assert_eq!(render(&engine, "one", json!(null)), "[1]");
    }
}

#[cfg(test)]
mod registration_tests {
    use super::*;

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let engine = engine_with(&[("snippet", "first")]);
        let err = engine.register("snippet", "second").unwrap_err();
        assert!(matches!(err, ViewError::DuplicateDefinition(ref n) if n == "snippet"));
        assert_eq!(render(&engine, "snippet", json!(null)), "first");
    }

    #[test]
    fn test_duplicate_page_registration() {
        let engine = engine_with(&[("home", "{{define \"__body\"}}a{{end}}")]);
        assert!(matches!(
            engine.register("/home", "{{define \"__body\"}}b{{end}}"),
            Err(ViewError::DuplicateDefinition(_))
        ));
    }

    #[test]
    fn test_unmarked_section_is_partial() {
        let engine = engine_with(&[(
            "first",
            "{{define \"body\"}}first body{{end}}{{template \"body\"}}",
        )]);
        assert!(engine.is_partial("first"));
        assert!(engine.is_partial("body"));
        assert!(!engine.is_page("first"));

        // A second unit defining the same unmarked name collides.
        let err = engine
            .register("second", "{{define \"body\"}}second body{{end}}")
            .unwrap_err();
        assert!(matches!(err, ViewError::DuplicateDefinition(ref n) if n == "body"));
        assert!(!engine.is_partial("second"));
        assert_eq!(render(&engine, "first", json!(null)), "first body");
    }

    #[test]
    fn test_names_are_normalized() {
        let engine = engine_with(&[("/views/a.gohtml", "A")]);
        assert!(engine.is_partial("views/a.gohtml"));
        assert_eq!(render(&engine, "/views/a.gohtml", json!(null)), "A");
        assert_eq!(engine.partial_names(), vec!["views/a.gohtml"]);
    }

    #[test]
    fn test_reserved_name_rejected() {
        let engine = ViewEngine::new();
        assert!(matches!(engine.register("~page", "x"), Err(ViewError::ReservedName(_))));
        assert!(matches!(
            engine.register("ok", "{{define \"~page\"}}x{{end}}"),
            Err(ViewError::Parse { .. })
        ));
        assert!(engine.partial_names().is_empty());
    }

    #[test]
    fn test_parse_error_registers_nothing() {
        let engine = ViewEngine::new();
        let err = engine
            .register("broken", "{{define \"nav\"}}N{{end}}\n{{if .x}}open")
            .unwrap_err();
        match err {
            ViewError::Parse { file, line, .. } => {
                assert_eq!(file.as_deref(), Some("broken"));
                assert_eq!(line, 2);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(!engine.is_partial("nav"));
        assert!(!engine.is_partial("broken"));
    }

    #[test]
    fn test_introspection() {
        let engine = engine_with(&[
            ("layout", "{{define \"nav\"}}N{{end}}{{template \"__body\"}}"),
            ("home", "{{define \"__body\"}}h{{end}}{{template \"layout\"}}"),
        ]);
        assert_eq!(engine.page_names(), vec!["home"]);
        assert_eq!(engine.partial_names(), vec!["layout", "nav"]);
    }

    #[test]
    fn test_render_unknown_name_writes_nothing() {
        let engine = ViewEngine::new();
        let mut out = Vec::new();
        let err = engine.render(&mut out, "missing", &json!(null)).unwrap_err();
        assert!(matches!(err, ViewError::NotFound(ref n) if n == "missing"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_composition_error_writes_nothing() {
        let engine = engine_with(&[
            ("a", "{{define \"__x\"}}{{end}}{{template \"b\"}}"),
            ("b", "{{define \"__x\"}}{{end}}{{template \"a\"}}"),
        ]);
        let mut out = Vec::new();
        let err = engine.render(&mut out, "a", &json!(null)).unwrap_err();
        assert!(matches!(err, ViewError::Composition { ref page, .. } if page == "a"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_with_config_disables_escaping() {
        let engine = ViewEngine::with_config(EngineConfig::new().with_escape_html(false));
        engine.register("t", "{{.}}").unwrap();
        assert!(!engine.config().escape_html);
        assert_eq!(render(&engine, "t", json!("<b>")), "<b>");

        let escaping = engine_with(&[("t", "{{.}}")]);
        assert_eq!(render(&escaping, "t", json!("<b>")), "&lt;b&gt;");
    }

    #[test]
    fn test_missing_key_error_policy() {
        let engine = ViewEngine::with_config(EngineConfig::new().with_missing_key(MissingKey::Error));
        engine.register("t", "a{{.missing}}").unwrap();
        let mut out = Vec::new();
        assert!(matches!(
            engine.render(&mut out, "t", &json!({})),
            Err(ViewError::Runtime { .. })
        ));
        assert_eq!(out, b"a");
    }
}

#[cfg(test)]
mod file_tests {
    use super::*;

    #[test]
    fn test_register_glob() {
        let dir = views_dir(&[
            ("layouts/main.gohtml", "<main>{{template \"__body\" .}}</main>"),
            ("home.gohtml", "{{define \"__body\"}}{{.}}{{end}}{{template \"layouts/main.gohtml\" .}}"),
            ("README.md", "not a view"),
        ]);

        let engine = ViewEngine::new();
        engine.register_glob(dir.path(), "**/*.gohtml").unwrap();

        assert_eq!(engine.page_names(), vec!["home.gohtml"]);
        assert_eq!(engine.partial_names(), vec!["layouts/main.gohtml"]);
        assert_eq!(render(&engine, "home.gohtml", json!("hi")), "<main>hi</main>");
    }

    #[test]
    fn test_register_glob_without_match_registers_nothing() {
        let dir = views_dir(&[("a.txt", "A")]);
        let engine = ViewEngine::new();
        let err = engine.register_glob(dir.path(), "*.gohtml").unwrap_err();
        assert!(matches!(err, ViewError::NoMatch(_)));
        assert!(engine.partial_names().is_empty());
        assert!(engine.page_names().is_empty());
    }

    #[test]
    fn test_register_files() {
        let dir = views_dir(&[("a.gohtml", "A"), ("b.gohtml", "B{{template \"a.gohtml\"}}")]);
        let engine = ViewEngine::new();
        engine
            .register_files(dir.path(), &["a.gohtml", "/b.gohtml"])
            .unwrap();
        assert_eq!(render(&engine, "b.gohtml", json!(null)), "BA");
    }

    #[test]
    fn test_register_files_requires_names() {
        let engine = ViewEngine::new();
        let none: [&str; 0] = [];
        assert!(matches!(
            engine.register_files(".", &none),
            Err(ViewError::NoFiles)
        ));
    }

    #[test]
    fn test_register_files_unreadable_file_registers_nothing() {
        let dir = views_dir(&[("a.gohtml", "A"), ("c.gohtml", "C")]);
        let engine = ViewEngine::new();
        let err = engine
            .register_files(dir.path(), &["a.gohtml", "missing.gohtml", "c.gohtml"])
            .unwrap_err();
        assert!(matches!(err, ViewError::Io(_)));
        assert!(!engine.is_partial("a.gohtml"));
        assert!(!engine.is_partial("c.gohtml"));

        engine.register_files(dir.path(), &["a.gohtml", "c.gohtml"]).unwrap();
        assert!(engine.is_partial("a.gohtml"));
    }

    #[test]
    fn test_register_files_stops_at_first_registration_error() {
        let dir = views_dir(&[("a.gohtml", "A"), ("b.gohtml", "{{if}}"), ("c.gohtml", "C")]);
        let engine = ViewEngine::new();
        let err = engine
            .register_files(dir.path(), &["a.gohtml", "b.gohtml", "c.gohtml"])
            .unwrap_err();
        assert!(matches!(err, ViewError::Parse { .. }));
        assert!(engine.is_partial("a.gohtml"));
        assert!(!engine.is_partial("b.gohtml"));
        assert!(!engine.is_partial("c.gohtml"));
    }

    #[test]
    fn test_register_glob_under_root_with_glob_characters() {
        let dir = views_dir(&[("site[1]/a.gohtml", "A")]);
        let engine = ViewEngine::new();
        engine.register_glob(dir.path().join("site[1]"), "*.gohtml").unwrap();
        assert_eq!(render(&engine, "a.gohtml", json!(null)), "A");
    }
}

#[cfg(test)]
mod concurrency_tests {
    use super::*;

    #[test]
    fn test_concurrent_renders_are_isolated() {
        let engine = Arc::new(engine_with(&[
            ("layout", "<{{template \"__body\" .}}|{{optional \"__side\"}}>"),
            ("one", "{{define \"__body\"}}one:{{.}}{{end}}{{template \"layout\" .}}"),
            (
                "two",
                "{{define \"__body\"}}two:{{.}}{{end}}{{define \"__side\"}}S{{end}}{{template \"layout\" .}}",
            ),
        ]));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for n in 0..50 {
                        let (page, expected) = if (i + n) % 2 == 0 {
                            ("one", format!("<one:{}|>", n))
                        } else {
                            ("two", format!("<two:{}|S>", n))
                        };
                        assert_eq!(engine.render_to_string(page, &json!(n)).unwrap(), expected);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_concurrent_duplicate_registration() {
        let engine = Arc::new(ViewEngine::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || engine.register("shared", &format!("v{}", i)).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(engine.partial_names(), vec!["shared"]);
    }

    #[test]
    fn test_registration_during_render_snapshot() {
        let engine = engine_with(&[
            ("layout", "[{{template \"__body\"}}{{optional \"late\"}}]"),
            ("home", "{{define \"__body\"}}h{{end}}{{template \"layout\"}}"),
        ]);
        assert_eq!(render(&engine, "home", json!(null)), "[h]");
        engine.register("late", "L").unwrap();
        assert_eq!(render(&engine, "home", json!(null)), "[hL]");
    }
}
