//! Prompt construction for the minutes → action-plan extraction call.
//!
//! One instruction, one call: the field contract and the required output shape
//! come first, the raw minutes go in verbatim at the end. Pure string
//! building — the oracle boundary owns all failure modes.

/// Wire field contract the model is asked to honor. The parser's raw shape
/// mirrors this list exactly.
pub const CONTRACT_FIELDS: &[&str] = &[
    "dateTime",
    "sector",
    "assignee",
    "investment",
    "action",
    "solution",
    "startDate",
    "endDate",
    "status",
    "observations",
];

/// Build the extraction instruction for a meeting-minutes transcript.
pub fn build_extraction_prompt(minutes: &str) -> String {
    let mut prompt = String::with_capacity(2048 + minutes.len());

    prompt.push_str(
        "Você é um assistente especializado em extrair planos de ação de atas de reunião.\n\
         Analise o texto abaixo, que é um resumo de reunião, e extraia os planos de ação mencionados.\n\n",
    );

    prompt.push_str(
        "Para cada plano de ação, identifique:\n\
         - dateTime: data e hora da criação, no formato YYYY-MM-DD HH:mm\n\
         - sector: setor responsável\n\
         - assignee: nome da pessoa responsável\n\
         - investment: valor do investimento necessário, incluindo a moeda quando mencionada\n\
         - action: descrição clara e objetiva da ação a ser tomada\n\
         - solution: como a ação será executada\n\
         - startDate: data de início, no formato YYYY-MM-DD\n\
         - endDate: data de término, no formato YYYY-MM-DD\n\
         - status: \"progress\" para em andamento, \"complete\" para concluído, \"overdue\" para atrasado\n\
         - observations: observações adicionais (opcional)\n\n",
    );

    prompt.push_str(
        "Retorne apenas um array JSON com os planos de ação identificados, seguindo exatamente este formato:\n\
         [\n\
         \x20 {\n\
         \x20   \"dateTime\": \"YYYY-MM-DD HH:mm\",\n\
         \x20   \"sector\": \"string\",\n\
         \x20   \"assignee\": \"string\",\n\
         \x20   \"investment\": \"string\",\n\
         \x20   \"action\": \"string\",\n\
         \x20   \"solution\": \"string\",\n\
         \x20   \"startDate\": \"YYYY-MM-DD\",\n\
         \x20   \"endDate\": \"YYYY-MM-DD\",\n\
         \x20   \"status\": \"progress\" | \"complete\" | \"overdue\",\n\
         \x20   \"observations\": \"string\"\n\
         \x20 }\n\
         ]\n\n",
    );

    prompt.push_str(
        "Importante:\n\
         - Use os formatos de data especificados\n\
         - Extraia o setor do contexto quando possível\n\
         - Use as datas mencionadas no texto para início e término\n\
         - O status deve ser um dos três valores: \"progress\", \"complete\", \"overdue\"\n\
         - Inclua observações relevantes quando disponíveis\n\n",
    );

    prompt.push_str("Texto da reunião:\n");
    prompt.push_str(minutes);

    prompt
}
