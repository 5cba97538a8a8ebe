use clap::Parser;
use helpdown::convert::{self, Layout};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "helpdown")]
#[command(version)]
#[command(about = "Convert a help-center HTML export into a Markdown docs tree")]
#[command(long_about = "\
Convert a help-center HTML export into a Markdown docs tree

The export's index.html is the table of contents: each chapter becomes a
docs directory with a _category_.json descriptor, and each linked template
becomes a front-matter-annotated .mdx file. Inline images are mirrored
into the static asset tree.

Expected export layout:

  <source>/
  ├── index.html                 # Navigation manifest
  ├── templates/                 # One HTML file per page
  │   ├── guide/intro.html
  │   └── ...
  └── inline-images/             # Images referenced from templates

The output directory is deleted and fully regenerated on every run: the
docs tree is a pure function of the export, never edited in place.")]
struct Cli {
    /// Root of the extracted help-center export
    #[arg(long, default_value = "extracted/sdk-reference")]
    source: PathBuf,

    /// Output directory for the generated Markdown tree
    #[arg(long, default_value = "docs")]
    docs: PathBuf,

    /// Static image directory (mirror lands in <dir>/inline-images)
    #[arg(long, default_value = "static/img")]
    static_img: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    let layout = Layout {
        export_root: cli.source,
        docs_dir: cli.docs,
        static_img_dir: cli.static_img,
    };

    match convert::run(&layout) {
        Ok(summary) => {
            println!(
                "Documentation converted successfully: {} sections, {} documents, {} images.",
                summary.sections, summary.documents, summary.images_copied
            );
        }
        Err(err) => {
            eprintln!("Conversion failed.");
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
