use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, anyhow};
use orbit_compiler::{Diagnostic, Registry, compile, lex, parse};
use orbit_core::{TaskQueue, Value};
use orbit_dom::{Document, MemoryDocument};
use orbit_runtime::{Config, Options, Runtime};
use tracing::debug;

const ANCHOR: &str = "orbit-root";

pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Load a JSON config file, then apply command-line overrides.
pub fn load_config(path: Option<&Path>, silent: bool, prefix: Option<&str>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_json(&read_source(path)?)
            .with_context(|| format!("invalid config in {}", path.display()))?,
        None => Config::default(),
    };
    config.silent |= silent;
    if let Some(prefix) = prefix {
        config.directive_prefix = prefix.to_string();
    }
    Ok(config)
}

/// Instance data: a JSON object, inline or from a file.
pub fn load_data(inline: Option<&str>, file: Option<&Path>) -> Result<Value> {
    let text = match (inline, file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => read_source(path)?,
        (None, None) => return Ok(Value::Object(Default::default())),
    };
    let value: Value = serde_json::from_str(&text).context("data is not valid JSON")?;
    if !value.is_object() {
        return Err(anyhow!("data must be a JSON object"));
    }
    Ok(value)
}

/// One token per line.
pub fn tokens_cmd(template: &str) -> String {
    lex(template)
        .iter()
        .map(|t| format!("{t:?}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn ast_cmd(template: &str, prefix: &str) -> String {
    let parsed = parse(&lex(template), prefix);
    let mut out = format!("{:#?}", parsed.root);
    push_diagnostics(&mut out, &parsed.diagnostics);
    out
}

/// The generated render IR, followed by any diagnostics.
pub fn compile_cmd(template: &str, prefix: &str) -> String {
    let compiled = compile(template, &Registry::with_defaults(), prefix);
    let mut out = format!("{:#?}", compiled.render);
    push_diagnostics(&mut out, &compiled.diagnostics);
    out
}

fn push_diagnostics(out: &mut String, diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        out.push_str(&format!("\n{:?}: {}", d.kind, d.message));
    }
}

#[derive(Debug)]
pub struct Rendered {
    pub html: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Render `template` against `data` into a fresh in-memory document.
pub fn render_cmd(template: &str, data: Value, config: Config) -> Result<Rendered> {
    let doc = MemoryDocument::shared();
    let queue = Rc::new(TaskQueue::new());
    let runtime = Runtime::new(config, doc.clone(), queue.clone());
    runtime.load_markup(None, &format!("<div id=\"{ANCHOR}\"></div>"));

    let app = runtime
        .create(Options::new().el(format!("#{ANCHOR}")).template(template).data(data))
        .map_err(|e| anyhow!("render failed: {e}"))?;
    queue.flush().map_err(|e| anyhow!("deferred work failed: {e}"))?;

    let html = match app.el() {
        Some(el) => doc.borrow().outer_html(el),
        None => String::new(),
    };
    debug!(bytes = html.len(), "rendered template");
    Ok(Rendered {
        html,
        diagnostics: runtime.diagnostics(),
    })
}

/// Mount onto pre-rendered `page` markup at `selector`, adopting the existing nodes,
/// and print the resulting page.
pub fn hydrate_cmd(
    page: &str,
    selector: &str,
    template: Option<&str>,
    data: Value,
    config: Config,
) -> Result<Rendered> {
    let doc = MemoryDocument::shared();
    let queue = Rc::new(TaskQueue::new());
    let runtime = Runtime::new(config, doc.clone(), queue.clone());
    runtime.load_markup(None, page);

    let mut options = Options::new().el(selector).data(data);
    if let Some(template) = template {
        options = options.template(template);
    }
    let app = runtime
        .create(options)
        .map_err(|e| anyhow!("hydration failed: {e}"))?;
    queue.flush().map_err(|e| anyhow!("deferred work failed: {e}"))?;
    if !app.is_mounted() {
        return Err(anyhow!("nothing matches `{selector}`"));
    }

    let html = {
        let doc = doc.borrow();
        doc.inner_html(doc.root())
    };
    debug!(selector, mutations = doc.borrow().mutations(), "hydrated page");
    Ok(Rendered {
        html,
        diagnostics: runtime.diagnostics(),
    })
}
