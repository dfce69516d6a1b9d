use console::style;
use termimad::MadSkin;

/// Heuristic used to decide between plain output and termimad rendering.
pub fn looks_like_markdown(text: &str) -> bool {
    text.contains("```")
        || text.contains("**")
        || text.contains('`')
        || text.lines().any(|line| {
            let line = line.trim_start();
            line.starts_with('#') || line.starts_with("- ") || line.starts_with("* ")
        })
}

pub fn display_welcome(assistant_name: &str, model: &str, store_kind: &str) {
    let term = console::Term::stdout();
    let width = std::cmp::min((term.size().1 as usize).saturating_sub(4), 80).max(40);

    println!("{}", style("═".repeat(width)).dim());
    println!(
        "{} {}",
        style("🤖").bold(),
        style(format!("{} - assistente corporativo", assistant_name))
            .bold()
            .cyan()
    );
    println!(
        "{}",
        style(format!("modelo: {} | registros: {}", model, store_kind)).dim()
    );
    println!(
        "{}",
        style("Digite 'menu' para ver as opções, /ajuda para os comandos, Ctrl+D para sair.").dim()
    );
    println!("{}", style("═".repeat(width)).dim());
}

/// Label printed before a reply; streaming replies print their chunks right after it.
pub fn display_assistant_prefix(assistant_name: &str) {
    print!("{} ", style(format!("{}:", assistant_name)).bold().blue());
}

pub fn display_reply(assistant_name: &str, text: &str) {
    if looks_like_markdown(text) {
        println!("{}", style(format!("{}:", assistant_name)).bold().blue());
        display_markdown(text);
    } else {
        display_assistant_prefix(assistant_name);
        println!("{}", text);
    }
}

pub fn display_markdown(text: &str) {
    let skin = MadSkin::default();
    skin.print_text(text);
}

pub fn display_info(text: &str) {
    println!("{}", style(text).dim());
}

pub fn display_error(text: &str) {
    eprintln!("{} {}", style("⚠️").bold().red(), style(text).red());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_markdown_replies() {
        assert!(looks_like_markdown("## Resumo\ntexto"));
        assert!(looks_like_markdown("Use **negrito** aqui"));
        assert!(looks_like_markdown("Itens:\n- um\n- dois"));
        assert!(!looks_like_markdown("👥 Equipe:\n• Ana - Analista"));
        assert!(!looks_like_markdown("Olá! Tudo bem?"));
    }
}
