//! Prompt templates keyed by program type.
//!
//! Template text is placeholder-level only; the production copy is
//! operator-supplied content, loaded over these defaults.

use std::collections::HashMap;

use cs_domain::conversation::ProgramType;
use cs_domain::customer::CustomerData;

const PRIME_TEMPLATE: &str = "Eres un asesor consultivo del programa PRIME, \
enfocado en rendimiento y energía para profesionales. Cliente: {customer_name}, \
{age} años. Conversa en su idioma, guía sin presionar y propone siempre un \
siguiente paso concreto.";

const LONGEVITY_TEMPLATE: &str = "Eres un asesor consultivo del programa \
LONGEVITY, enfocado en vitalidad y salud a largo plazo. Cliente: \
{customer_name}, {age} años. Conversa en su idioma, con calma y claridad, y \
propone siempre un siguiente paso concreto.";

const HYBRID_TEMPLATE: &str = "Eres un asesor consultivo que aún está \
determinando el programa ideal para {customer_name}, {age} años. Explora sus \
objetivos para distinguir entre rendimiento (PRIME) y vitalidad (LONGEVITY).";

/// Per-program system templates.
pub struct PromptLibrary {
    templates: HashMap<ProgramType, String>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        let mut templates = HashMap::new();
        templates.insert(ProgramType::Prime, PRIME_TEMPLATE.to_string());
        templates.insert(ProgramType::Longevity, LONGEVITY_TEMPLATE.to_string());
        templates.insert(ProgramType::Hybrid, HYBRID_TEMPLATE.to_string());
        Self { templates }
    }
}

impl PromptLibrary {
    /// Replace the template for a program (prompt-variant deployments
    /// land here).
    pub fn set_template(&mut self, program: ProgramType, template: impl Into<String>) {
        self.templates.insert(program, template.into());
    }

    /// Render the system prompt for a program and customer.
    pub fn render(&self, program: ProgramType, customer: &CustomerData) -> String {
        let template = self
            .templates
            .get(&program)
            .map(String::as_str)
            .unwrap_or(HYBRID_TEMPLATE);
        template
            .replace("{customer_name}", customer.given_name())
            .replace("{age}", &customer.age.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_substituted() {
        let customer = CustomerData::new("c", "Ana María", "a@b.com", 34).unwrap();
        let library = PromptLibrary::default();
        let prompt = library.render(ProgramType::Prime, &customer);
        assert!(prompt.contains("Ana"));
        assert!(prompt.contains("34"));
        assert!(!prompt.contains("{customer_name}"));
    }

    #[test]
    fn overridden_template_wins() {
        let customer = CustomerData::new("c", "Ana", "a@b.com", 34).unwrap();
        let mut library = PromptLibrary::default();
        library.set_template(ProgramType::Prime, "hola {customer_name}");
        assert_eq!(library.render(ProgramType::Prime, &customer), "hola Ana");
    }
}
