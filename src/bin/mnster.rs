use std::{io::Write,
          path::PathBuf,
          sync::atomic::Ordering};

use adom::Document;
use anyhow::{Result, Context, anyhow, bail};
use clap::Parser as ClapParser;
use mnster::{create_view, set_prefix, warn::{QUIET, warning_count}, ViewOptions};


#[derive(clap::Parser, Debug)]
/// Bind an HTML template to a JSON model and print the result.
struct Args {
    /// The HTML file to bind (a fragment, no need for a full document)
    #[clap(long)]
    template: PathBuf,

    /// The JSON file holding the model
    #[clap(long)]
    model: PathBuf,

    /// The name the model is visible under in the template's paths
    #[clap(long)]
    context: String,

    /// The attribute prefix, instead of "mns"
    #[clap(long)]
    prefix: Option<String>,

    /// Where to write the result, instead of stdout
    #[clap(long)]
    output: Option<PathBuf>,

    /// Don't print warnings about failed bindings (still exit with
    /// an error if there were any)
    #[clap(long)]
    quiet: bool,
}

/// The bound HTML, and the number of bindings that failed on the
/// way (those were reported via `warn!`).
#[derive(Debug)]
struct Rendered {
    html: String,
    failed: usize,
}

impl Rendered {
    fn status(&self) -> Result<()> {
        if self.failed > 0 {
            bail!("{} binding(s) failed", self.failed)
        }
        Ok(())
    }
}

fn render(template: &str, context: &str, model: serde_json::Value) -> Result<Rendered> {
    let warnings = warning_count();
    let mut doc = Document::new();
    let wrapper = doc.create_element("body");
    doc.set_inner_html(wrapper, template)
        .with_context(|| anyhow!("parsing template"))?;
    create_view(&mut doc, wrapper, ViewOptions::new(context, model))?;
    let mut html = doc.inner_html(wrapper);
    html.push('\n');
    Ok(Rendered { html, failed: warning_count() - warnings })
}

fn main() -> Result<()> {
    let args = Args::parse();
    QUIET.store(args.quiet, Ordering::SeqCst);
    if let Some(prefix) = &args.prefix {
        set_prefix(prefix)?;
    }

    let template = std::fs::read_to_string(&args.template)
        .with_context(|| anyhow!("reading template {:?}", args.template))?;
    let model: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(&args.model)
            .with_context(|| anyhow!("reading model {:?}", args.model))?)
        .with_context(|| anyhow!("parsing model {:?}", args.model))?;

    let rendered = render(&template, &args.context, model)
        .with_context(|| anyhow!("rendering {:?}", args.template))?;
    match &args.output {
        Some(path) => std::fs::write(path, &rendered.html)
            .with_context(|| anyhow!("writing {path:?}"))?,
        None => {
            let mut outp = std::io::stdout().lock();
            outp.write_all(rendered.html.as_bytes())?;
            outp.flush()?;
        }
    }
    // The output is written even if bindings failed
    rendered.status()
}
