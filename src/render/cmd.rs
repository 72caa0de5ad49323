//! Render command kinds

use std::fmt;

/// What the report regenerator should rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderCmd {
    /// Regenerate everything (issued by the driver at startup)
    All,
    /// Flush pending output to its final location
    Flush,
    /// Regenerate the progress page
    Progress,
    /// Regenerate the report pages
    Reports,
}

impl fmt::Display for RenderCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderCmd::All => write!(f, "all"),
            RenderCmd::Flush => write!(f, "flush"),
            RenderCmd::Progress => write!(f, "progress"),
            RenderCmd::Reports => write!(f, "reports"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_cmd_display() {
        let cases = [
            (RenderCmd::All, "all"),
            (RenderCmd::Flush, "flush"),
            (RenderCmd::Progress, "progress"),
            (RenderCmd::Reports, "reports"),
        ];
        for (cmd, want) in cases {
            assert_eq!(cmd.to_string(), want);
        }
    }
}
