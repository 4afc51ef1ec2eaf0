use crate::core::config::data::Config;

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.base_url {
            Some(url) => println!("  base-url: {url}"),
            None => println!("  base-url: (unset, using {})", self.base_url_or_default()),
        }
        match &self.default_model {
            Some(model) => println!("  default-model: {model}"),
            None => println!("  default-model: (unset)"),
        }
        match &self.language {
            Some(language) => println!("  language: {language}"),
            None => println!("  language: (unset)"),
        }
        match &self.system_prompt {
            Some(prompt) => println!("  system-prompt: {prompt}"),
            None => println!("  system-prompt: (unset)"),
        }
        match self.reasoning_heuristic.unwrap_or(false) {
            true => println!("  reasoning-heuristic: on"),
            false => println!("  reasoning-heuristic: off"),
        }
    }
}
