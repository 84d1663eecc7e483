//! Server-rendered HTML. All record text goes through [`escape`].

use serde_json::json;

use crate::models::{Answer, Choice, Question, QuestionType, Space};
use crate::store::Feedback;

/// Blank choice inputs offered on the add-question form.
const CHOICE_INPUTS: usize = 4;

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/css/app.css">
<script src="/js/app.js" defer></script>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape(title),
    )
}

pub fn index() -> String {
    layout(
        "Feedback",
        r#"<main class="index">
<h1>Collect feedback in seconds</h1>
<p>Create a space, add your questions and share the link.</p>
<form method="post" action="/feedback">
<label>Title <input name="title" required maxlength="255"></label>
<label>Open until <input type="date" name="valid_until" required></label>
<button type="submit">Create space</button>
</form>
</main>"#,
    )
}

/// Public space fields for client scripts. `</` is escaped so the payload
/// cannot close the surrounding script element.
fn space_json(space: &Space) -> String {
    json!({
        "id": space.id,
        "title": space.title,
        "slug": space.slug,
        "valid_until": space.valid_until.format("%Y-%m-%d").to_string(),
    })
    .to_string()
    .replace("</", "<\\/")
}

pub fn feedback_page(feedback: &Feedback, password: Option<&str>, created: bool) -> String {
    let space = &feedback.space;
    let host = space.is_host(password);
    let mut body = String::new();

    body.push_str(&format!(
        r#"<script type="application/json" id="space">{json}</script>
<main class="space" data-slug="{slug}">
<header>
<h1>{title}</h1>
<p class="valid-until">Open until {valid_until}</p>
"#,
        json = space_json(space),
        slug = escape(&space.slug),
        title = escape(&space.title),
        valid_until = space.valid_until.format("%Y-%m-%d"),
    ));

    if host && created {
        body.push_str(
            r#"<p class="notice created">Space created. Bookmark this page now: its link is the only way back to the host view.</p>
"#,
        );
    }

    if host {
        body.push_str(&format!(
            r#"<p class="host">PIN <strong>{pin}</strong>. Keep this page's link private, it lets you add questions.</p>
"#,
            pin = space.pin,
        ));
    }
    body.push_str("</header>\n<section id=\"questions\">\n");

    for question in &feedback.questions {
        body.push_str(&question_fragment(
            space,
            question,
            related(&feedback.choices_by_question, &question.id),
            related(&feedback.answers_by_question, &question.id),
        ));
    }
    body.push_str("</section>\n");

    if let (true, Some(password)) = (host, password) {
        body.push_str(&add_question_form(space, password));
    }
    body.push_str("</main>");

    layout(&space.title, &body)
}

fn related<'a, T>(map: &'a std::collections::HashMap<String, Vec<T>>, id: &str) -> &'a [T] {
    map.get(id).map(Vec::as_slice).unwrap_or(&[])
}

pub fn question_fragment(
    space: &Space,
    question: &Question,
    choices: &[Choice],
    answers: &[Answer],
) -> String {
    let mut inputs = String::new();
    match question.kind {
        QuestionType::Textarea => {
            inputs.push_str(r#"<textarea name="text[]" required></textarea>"#);
        }
        QuestionType::Choice | QuestionType::MultiChoice => {
            let input_type = if question.kind == QuestionType::Choice {
                "radio"
            } else {
                "checkbox"
            };
            for choice in choices {
                inputs.push_str(&format!(
                    r#"<label><input type="{input_type}" name="text[]" value="{text}"> {text}</label>
"#,
                    text = escape(&choice.text),
                ));
            }
        }
    }

    let mut answer_items = String::new();
    for answer in answers {
        answer_items.push_str(&format!(
            "<li>{}</li>\n",
            escape(&answer.text)
        ));
    }

    format!(
        r#"<article class="question" id="question-{id}" data-type="{kind}">
<h2>{text}</h2>
<form method="post" action="/s/{slug}/answer" data-ajax>
<input type="hidden" name="question_id" value="{id}">
{inputs}<button type="submit">Send</button>
</form>
<ul class="answers">
{answer_items}</ul>
</article>
"#,
        id = escape(&question.id),
        kind = question.kind,
        text = escape(&question.text),
        slug = escape(&space.slug),
    )
}

fn add_question_form(space: &Space, password: &str) -> String {
    let choice_inputs = r#"<input name="choices[]" placeholder="Choice">
"#
    .repeat(CHOICE_INPUTS);

    format!(
        r#"<form class="add-question" method="post" action="/s/{slug}/question" data-ajax data-target="questions">
<input type="hidden" name="password" value="{password}">
<label>Question <input name="text" required></label>
<label>Type
<select name="type">
<option value="choice">Single choice</option>
<option value="multichoice">Multiple choice</option>
<option value="textarea">Free text</option>
</select>
</label>
<fieldset class="choices">
{choice_inputs}</fieldset>
<button type="submit">Add question</button>
</form>
"#,
        slug = escape(&space.slug),
        password = escape(password),
    )
}
