//! Per-module diagnostic lines

use console::style;

/// Outcome of one chart, printed as `Label(detail): module`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleLine {
    Modified,
    Unchanged,
    ConvertError(String),
    Deleted(String),
    NodeSelectorCorrected,
    /// Keys the README install command passes with `--set`
    SetOptions(Vec<String>),
}

impl ModuleLine {
    pub fn render(&self, module: &str) -> String {
        match self {
            Self::Modified => format!("{}: {}", style("Modify(values)").green(), module),
            Self::Unchanged => format!("{}: {}", style("Unchanged(values)").dim(), module),
            Self::ConvertError(message) => format!(
                "{}: {}",
                style(format!("ConvertERR({})", message)).red(),
                module
            ),
            Self::Deleted(reason) => {
                format!("{}: {}", style(format!("Delete({})", reason)).yellow(), module)
            }
            Self::NodeSelectorCorrected => {
                format!("{}: {}", style("Modify(nodeSelector)").cyan(), module)
            }
            Self::SetOptions(keys) => format!(
                "{}: {}",
                style(format!("SetOption({})", keys.join(","))).magenta(),
                module
            ),
        }
    }

    pub fn print(&self, module: &str) {
        println!("{}", self.render(module));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_plain() {
        console::set_colors_enabled(false);
        assert_eq!(ModuleLine::Modified.render("redis"), "Modify(values): redis");
        assert_eq!(
            ModuleLine::Deleted("TLDR".into()).render("old"),
            "Delete(TLDR): old"
        );
        assert_eq!(
            ModuleLine::ConvertError("boom".into()).render("x"),
            "ConvertERR(boom): x"
        );
        assert_eq!(
            ModuleLine::SetOptions(vec!["auth.enabled".into(), "image.tag".into()]).render("redis"),
            "SetOption(auth.enabled,image.tag): redis"
        );
    }
}
