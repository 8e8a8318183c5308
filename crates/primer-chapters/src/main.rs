use anyhow::{bail, Result};
use primer_engine::logging::{init_logging, LoggingConfig};

mod chapters;
mod geometry;

use chapters::Chapter;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let Some(name) = std::env::args().nth(1) else {
        bail!("usage: primer-chapters <chapter>\n  chapters: {}", chapter_list());
    };
    let Some(chapter) = Chapter::from_name(&name) else {
        bail!("unknown chapter `{name}`\n  chapters: {}", chapter_list());
    };

    chapter.run()
}

fn chapter_list() -> String {
    Chapter::ALL.map(Chapter::name).join(", ")
}
