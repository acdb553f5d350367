use serde::{Deserialize, Serialize};

/// Response contract sent as the system instruction on every visualization call.
pub const SYSTEM_INSTRUCTION: &str = include_str!("prompts/system_instruction.md");

pub const SUMMARY_SECTION_LABEL: &str = "Section 1: Summary and Explanation";
pub const BOM_SECTION_LABEL: &str = "Section 3: Hardware Bill of Materials (BOM)";
pub const VALIDATION_ALERT_MARKER: &str = "VALIDATION ALERT";
pub const MARKUP_FENCE_TAG: &str = "html";
pub const DOCTYPE_MARKER: &str = "<!DOCTYPE html>";

const VALIDATION_DIRECTIVE: &str = "MODE: EXPERIMENT ERROR DETECTOR (MULTIMODAL VALIDATION).\n\
1. Cross-reference the uploaded image(s) against the textual description/procedure.\n\
2. Identify any discrepancies, safety violations, or setup errors.\n\
3. In the Summary section, YOU MUST explicitly include a \"## ⚠️ VALIDATION ALERT\" section detailing these errors if found.\n\
4. Then, generate the interactive visualization of the CORRECTED procedure.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    #[default]
    #[serde(rename = "Python (Matplotlib)")]
    PythonMatplotlib,
    #[serde(rename = "Jupyter Notebook (.ipynb JSON)")]
    JupyterNotebook,
    #[serde(rename = "LaTeX (TikZ)")]
    LatexTikz,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [
        ExportFormat::PythonMatplotlib,
        ExportFormat::JupyterNotebook,
        ExportFormat::LatexTikz,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::PythonMatplotlib => "Python (Matplotlib)",
            ExportFormat::JupyterNotebook => "Jupyter Notebook (.ipynb JSON)",
            ExportFormat::LatexTikz => "LaTeX (TikZ)",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.label().eq_ignore_ascii_case(trimmed))
    }
}

pub fn validation_directive() -> &'static str {
    VALIDATION_DIRECTIVE
}

pub fn export_instruction(source_code: &str, format: ExportFormat) -> String {
    format!(
        "You are an expert code converter.\n\
Transform the logic of the following HTML/JS scientific visualization into a {} script.\n\
\n\
Rules:\n\
1. If converting to Python (Matplotlib/NumPy), ensure it creates a static or animated plot that represents the same scientific concept.\n\
2. If converting to Jupyter Notebook, provide the JSON content for a .ipynb file.\n\
3. Keep the scientific formulas and logic intact.\n\
4. Return ONLY the code, no markdown fencing if possible, or inside a single code block.\n\
\n\
Source Code:\n\
{}",
        format.label(),
        source_code
    )
}
