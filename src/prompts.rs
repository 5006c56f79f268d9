//! Prompt templates for the generative pipelines.
//!
//! Each template embeds one worked example of the desired output and a single
//! [`TEXT_PLACEHOLDER`] where the extracted document text goes. Callers can
//! override a template via [`crate::config::PipelineConfig::prompt_template`];
//! the constants here are used only when no override is provided.

use crate::config::PipelineKind;

/// Placeholder substituted with the extracted document text.
pub const TEXT_PLACEHOLDER: &str = "{text_content}";

/// Company description (Word) → `{Question, Answer}` pairs.
pub const COMPANY_DESCRIPTION_PROMPT: &str = r#"
You are an expert data processing assistant. Your task is to read the company description text and generate high-quality Question-Answer (Q&A) pairs based *only* on the provided text.

You MUST return the output as a **valid JSON array (list)** of objects. Each object must contain "Question" and "Answer" keys.

---EXAMPLE START---

**Input Text:**
"CubeTriangle is a cutting-edge consumer electronics company headquartered in the vibrant city of Ottawa, Canada.
Motto: 'Connecting Innovation, Transforming Lifestyles.'
Company Philosophy: CubeTriangle places a strong emphasis on eco-conscious manufacturing."

**Output JSON:**
[
    {
      "Question": "Where is CubeTriangle headquartered?",
      "Answer": "CubeTriangle is headquartered in Ottawa, Canada."
    },
    {
      "Question": "What is the company motto?",
      "Answer": "'Connecting Innovation, Transforming Lifestyles.'"
    },
    {
      "Question": "What is the core philosophy of CubeTriangle?",
      "Answer": "The company places a strong emphasis on eco-conscious manufacturing, ensuring that each product aligns with sustainable practices."
    }
]
---EXAMPLE END---

Now, process the following text and generate the JSON output in the exact same format.
Try to generate as many relevant questions as possible covering all departments and details.

---TEXT START---
{text_content}
---TEXT END---
"#;

/// Product manual (PDF) → `{instruction, response}` pairs.
pub const PRODUCT_MANUAL_PROMPT: &str = r#"
You are an expert data processing assistant. Your task is to read product manual text and generate high-quality **Instruction-Response** pairs based *only* on the provided text.

You MUST return the output as a **valid JSON array (list)** of objects, structured exactly as shown in the example. Each object in the array must contain "**instruction**" and "**response**" keys (case-sensitive).

---EXAMPLE START---

**Input Text:**
"Powering On/Off: Press and hold the side button to power on your CubeTriangle Alpha Smartphone. To power off, press and hold the side button and either volume button, then swipe to power off on the screen.
Using Facial Recognition: Unlock your CubeTriangle Alpha Smartphone with facial recognition by looking directly at the front camera. Ensure proper lighting conditions for optimal performance.
Charging the Device: Charge your CubeTriangle Alpha Smartphone using the provided USB-C cable and power adapter. Connect the cable to the device, and plug the adapter into a power source. Enjoy fast charging with the 65W capability for quick and efficient charging. Capturing Photos: Activate the camera by opening the Camera app or using the dedicated shortcut.
Use the triple-lens camera system for high-quality photos. Experiment with different modes and settings for a personalized photography experience.
Customizing Display Settings: Adjust the display settings of your CubeTriangle Alpha Smartphone by navigating to 'Settings' and selecting 'Display.' Customize features such as brightness, color balance, and screen timeout to suit your preferences."

**Output JSON:**
[
    {
    "instruction": "Explain how to Power On/Off the CubeTriangle Alpha Smartphone.",
    "response": "To power on, press and hold the side button to power on your CubeTriangle Alpha Smartphone. To power off, press and hold the side button and either volume button, then swipe to power off on the screen."
    },
    {
    "instruction": "Provide instructions for using Facial Recognition on the CubeTriangle Alpha Smartphone.",
    "response": "Unlock your CubeTriangle Alpha Smartphone with facial recognition by looking directly at the front camera. Ensure proper lighting conditions for optimal performance."
    },
    {
    "instruction": "Guide on charging the CubeTriangle Alpha Smartphone.",
    "response": "Charge your CubeTriangle Alpha Smartphone using the provided USB-C cable and power adapter. Connect the cable to the device, and plug the adapter into a power source. Enjoy fast charging with the 65W capability for quick and efficient charging."
    },
    {
    "instruction": "How to capture photos using the CubeTriangle Alpha Smartphone?",
    "response": "Activate the camera by opening the Camera app or using the dedicated shortcut. Use the triple-lens camera system for high-quality photos. Experiment with different modes and settings for a personalized photography experience."
    },
    {
    "instruction": "Explain the process of customizing display settings on the CubeTriangle Alpha Smartphone.",
    "response": "Adjust the display settings of your CubeTriangle Alpha Smartphone by navigating to 'Settings' and selecting 'Display.' Customize features such as brightness, color balance, and screen timeout to suit your preferences."
    }
]
---EXAMPLE END---

Now, process the following text and generate the JSON output in the exact same format.
Try to generate as many pairs as possible, covering every distinct procedure and fact in the text.

---TEXT START---
{text_content}
---TEXT END---
"#;

/// Built-in template for a generative pipeline.
///
/// Returns `None` for the pattern-extraction pipeline, which never prompts.
pub fn default_template(kind: PipelineKind) -> Option<&'static str> {
    match kind {
        PipelineKind::CompanyDescription => Some(COMPANY_DESCRIPTION_PROMPT),
        PipelineKind::ProductManual => Some(PRODUCT_MANUAL_PROMPT),
        PipelineKind::ProductSpecifications => None,
    }
}

/// Substitute the document text into the template's placeholder.
///
/// Only the first placeholder is replaced, so document text that itself
/// contains `{text_content}` is passed through untouched.
pub fn render_prompt(template: &str, text: &str) -> String {
    template.replacen(TEXT_PLACEHOLDER, text, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_have_exactly_one_placeholder() {
        for t in [COMPANY_DESCRIPTION_PROMPT, PRODUCT_MANUAL_PROMPT] {
            assert_eq!(t.matches(TEXT_PLACEHOLDER).count(), 1);
        }
    }

    #[test]
    fn templates_name_their_keys() {
        assert!(COMPANY_DESCRIPTION_PROMPT.contains("\"Question\" and \"Answer\""));
        assert!(PRODUCT_MANUAL_PROMPT.contains("**instruction**"));
        assert!(PRODUCT_MANUAL_PROMPT.contains("**response**"));
    }

    #[test]
    fn templates_ask_for_full_coverage() {
        for t in [COMPANY_DESCRIPTION_PROMPT, PRODUCT_MANUAL_PROMPT] {
            assert!(t.contains("as many"), "template lacks a coverage request");
        }
    }

    #[test]
    fn render_substitutes_text() {
        let prompt = render_prompt(COMPANY_DESCRIPTION_PROMPT, "CubeTriangle makes phones.");
        assert!(prompt.contains("---TEXT START---\nCubeTriangle makes phones.\n---TEXT END---"));
        assert!(!prompt.contains(TEXT_PLACEHOLDER));
    }

    #[test]
    fn render_leaves_placeholder_inside_document_text() {
        let prompt = render_prompt("A {text_content} B", "x {text_content} y");
        assert_eq!(prompt, "A x {text_content} y B");
    }

    #[test]
    fn example_json_is_valid() {
        // The worked examples must themselves be the shape we ask for.
        for (template, kind) in [
            (COMPANY_DESCRIPTION_PROMPT, crate::output::DatasetKind::QuestionAnswer),
            (PRODUCT_MANUAL_PROMPT, crate::output::DatasetKind::InstructionResponse),
        ] {
            let start = template.find("**Output JSON:**\n").unwrap() + "**Output JSON:**\n".len();
            let end = template.find("---EXAMPLE END---").unwrap();
            let items: Vec<serde_json::Value> =
                serde_json::from_str(&template[start..end]).unwrap();
            assert!(!items.is_empty());
            assert!(items.iter().all(|i| kind.accepts(i)));
        }
    }

    #[test]
    fn specifications_have_no_template() {
        assert!(default_template(PipelineKind::ProductSpecifications).is_none());
        assert!(default_template(PipelineKind::ProductManual).is_some());
    }
}
