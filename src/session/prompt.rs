use crate::store::StoreSnapshot;

fn join_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(", ")
    }
}

/// Persona plus a short briefing about the company, rebuilt for every
/// forwarded message so the model sees the current records.
pub fn system_prompt(assistant_name: &str, snapshot: &StoreSnapshot) -> String {
    let mut prompt = format!(
        "Você é {name}, assistente virtual corporativo. Responda em português, \
         de forma cordial e objetiva. Use apenas as informações abaixo sobre a \
         empresa; se algo não estiver aqui, diga que não sabe.\n",
        name = assistant_name
    );

    match &snapshot.company {
        Some(company) if !company.founding_date.is_empty() => prompt.push_str(&format!(
            "A empresa {} foi fundada em {}.\n",
            company.name, company.founding_date
        )),
        Some(company) => prompt.push_str(&format!("A empresa se chama {}.\n", company.name)),
        None => prompt.push_str("A data de fundação da empresa é desconhecida.\n"),
    }

    let staff: Vec<String> = snapshot
        .employees
        .iter()
        .map(|e| {
            if e.role.is_empty() {
                e.name.clone()
            } else {
                format!("{} ({})", e.name, e.role)
            }
        })
        .collect();

    prompt.push_str(&format!(
        "Funcionários atuais: {}.\n",
        join_or(&staff, "nenhum cadastrado")
    ));
    prompt.push_str(&format!(
        "Projetos ativos: {}.\n",
        join_or(&snapshot.projects, "nenhum informado")
    ));
    prompt.push_str(&format!(
        "Relatórios existentes: {}.",
        join_or(&snapshot.report_dates, "nenhum ainda")
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Company, Employee};

    #[test]
    fn empty_store_is_described_explicitly() {
        let prompt = system_prompt("Eloy", &StoreSnapshot::default());
        assert!(prompt.starts_with("Você é Eloy"));
        assert!(prompt.contains("desconhecida"));
        assert!(prompt.contains("Relatórios existentes: nenhum ainda."));
    }

    #[test]
    fn records_are_listed() {
        let snapshot = StoreSnapshot {
            company: Some(Company {
                name: "Eloy Ltda".to_string(),
                founding_date: "05/05/2010".to_string(),
            }),
            employees: vec![Employee::new("Ana", "Analista"), Employee::new("Bruno", "")],
            projects: vec!["Portal RH".to_string()],
            report_dates: vec!["01/01/2025".to_string(), "02/01/2025".to_string()],
        };
        let prompt = system_prompt("Eloy", &snapshot);
        assert!(prompt.contains("A empresa Eloy Ltda foi fundada em 05/05/2010."));
        assert!(prompt.contains("Ana (Analista), Bruno"));
        assert!(prompt.contains("Portal RH"));
        assert!(prompt.contains("01/01/2025, 02/01/2025"));
    }
}
