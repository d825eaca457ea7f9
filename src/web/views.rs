//! Server-rendered pages.
//!
//! Every value that came from a user is escaped here. Model output arrives
//! already converted to HTML by the Markdown renderer and is inserted as is.

use crate::store::{ChatEntry, Customer, Interaction};
use crate::utils::escape_html;
use std::fmt::Write;

const BOOTSTRAP_CSS: &str = r#"<link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css" rel="stylesheet">"#;
const BOOTSTRAP_ICONS: &str = r#"<link href="https://cdn.jsdelivr.net/npm/bootstrap-icons/font/bootstrap-icons.css" rel="stylesheet">"#;
const BOOTSTRAP_JS: &str = r#"<script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/js/bootstrap.bundle.min.js"></script>"#;
const ANIME_JS: &str = r#"<script src="https://cdnjs.cloudflare.com/ajax/libs/animejs/3.2.1/anime.min.js"></script>"#;

const HOME_STYLE: &str = r#"<style>
    .table th { cursor: pointer; }
    .container { perspective: 1000px; }
    .table tr, .btn { opacity: 0; transform: translateZ(-100px) rotateX(45deg); transition: transform 0.3s ease; }
    .table tr.visible, .btn.visible { opacity: 1; transform: translateZ(0) rotateX(0deg); }
    .btn:hover { transform: translateY(-5px) scale(1.05); box-shadow: 0 4px 15px rgba(0,0,0,0.2); }
    .chat-container { position: fixed; bottom: 20px; right: 20px; width: 300px; z-index: 1000; }
    .chat-toggle { background-color: #007bff; color: white; border-radius: 50%; width: 50px; height: 50px; display: flex; align-items: center; justify-content: center; cursor: pointer; box-shadow: 0 2px 5px rgba(0,0,0,0.3); }
    .chat-window { display: none; background-color: #fff; border-radius: 10px; box-shadow: 0 4px 10px rgba(0,0,0,0.2); max-height: 400px; overflow: hidden; }
    .chat-header { background-color: #007bff; color: white; padding: 10px; font-weight: bold; }
    .chat-body { max-height: 300px; overflow-y: auto; padding: 10px; }
    .chat-message { margin: 5px 0; padding: 8px; border-radius: 5px; }
    .user-message { background-color: #007bff; color: white; margin-left: 20%; }
    .ai-message { background-color: #f1f1f1; margin-right: 20%; }
    .chat-input { display: flex; padding: 10px; border-top: 1px solid #ddd; }
    .chat-input input { flex-grow: 1; border: none; padding: 5px; }
    .chat-input button { background-color: #007bff; color: white; border: none; padding: 5px 10px; border-radius: 5px; }
    @media (max-width: 576px) {
        .chat-container { width: 90%; right: 5%; }
        .chat-window { max-height: 300px; }
    }
</style>"#;

const INSIGHT_STYLE: &str = r#"<style>
    .insight-card { background-color: #f8f9fa; border-radius: 10px; padding: 20px; box-shadow: 0 4px 8px rgba(0,0,0,0.1); }
    .insight-card h2 { color: #007bff; }
    .customer-details { font-size: 0.9em; color: #6c757d; }
</style>"#;

// Column sorting, scroll-in animation and the chat widget.
const HOME_SCRIPT: &str = r#"<script>
    function sortTable(n) {
        const table = document.getElementById("customerTable");
        const body = table.tBodies[0];
        const rows = Array.from(body.rows);
        const asc = table.dataset.sortCol != n || table.dataset.sortDir != "asc";
        rows.sort(function (a, b) {
            const x = a.cells[n].innerText.toLowerCase();
            const y = b.cells[n].innerText.toLowerCase();
            return asc ? x.localeCompare(y, undefined, { numeric: true }) : y.localeCompare(x, undefined, { numeric: true });
        });
        rows.forEach(function (row) { body.appendChild(row); });
        table.dataset.sortCol = n;
        table.dataset.sortDir = asc ? "asc" : "desc";
    }

    document.addEventListener('DOMContentLoaded', function () {
        const rows = document.querySelectorAll('#customerTable tbody tr');
        const buttons = document.querySelectorAll('.btn');

        function reveal(elements, from, step) {
            elements.forEach(function (el, index) {
                const rect = el.getBoundingClientRect();
                if (rect.top < window.innerHeight && rect.bottom >= 0 && !el.classList.contains('visible')) {
                    if (window.anime) {
                        anime({ targets: el, translateZ: [from, 0], rotateX: [45, 0], opacity: [0, 1], duration: 900, delay: index * step, easing: 'easeOutCubic' });
                    }
                    el.classList.add('visible');
                }
            });
        }

        function checkVisibility() {
            reveal(rows, 100, 100);
            reveal(buttons, 50, 50);
        }

        window.addEventListener('scroll', checkVisibility);
        checkVisibility();

        document.getElementById('chatInput').addEventListener('keypress', function (e) {
            if (e.key === 'Enter') sendMessage();
        });
    });

    function toggleChat() {
        const chatWindow = document.getElementById('chatWindow');
        chatWindow.style.display = chatWindow.style.display === 'block' ? 'none' : 'block';
        if (chatWindow.style.display === 'block') {
            document.getElementById('chatInput').focus();
            scrollChatToBottom();
        }
    }

    function scrollChatToBottom() {
        const chatBody = document.getElementById('chatBody');
        chatBody.scrollTop = chatBody.scrollHeight;
    }

    function appendChatMessage(cls, html, isText) {
        const div = document.createElement('div');
        div.className = 'chat-message ' + cls;
        if (isText) { div.textContent = html; } else { div.innerHTML = html; }
        document.getElementById('chatBody').appendChild(div);
        scrollChatToBottom();
    }

    async function sendMessage() {
        const input = document.getElementById('chatInput');
        const message = input.value.trim();
        if (!message) return;

        appendChatMessage('user-message', message, true);
        input.value = '';

        try {
            const response = await fetch('/chat', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ message: message })
            });
            const data = await response.json();
            if (data.response) {
                appendChatMessage('ai-message', data.response, false);
            } else {
                appendChatMessage('ai-message', 'Error: ' + data.error, true);
            }
        } catch (error) {
            appendChatMessage('ai-message', 'Error: ' + error.message, true);
        }
    }
</script>"#;

fn page(title: &str, head: &[&str], body: &str) -> String {
    let mut html = String::with_capacity(2048 + body.len());
    let _ = write!(
        html,
        "<!doctype html>\n<html lang=\"en\">\n<head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n",
        escape_html(title)
    );
    for part in head {
        html.push_str(part);
        html.push('\n');
    }
    html.push_str("</head>\n<body>\n");
    html.push_str(body);
    html.push_str("\n</body>\n</html>\n");
    html
}

fn opt(value: Option<&str>) -> String {
    escape_html(value.unwrap_or(""))
}

fn opt_or_na(value: Option<&str>) -> String {
    escape_html(value.filter(|v| !v.is_empty()).unwrap_or("N/A"))
}

pub fn setup_page() -> String {
    let body = r#"<div class="container mt-5">
    <h1 class="mb-4">Enter Your Groq API Key</h1>
    <form method="post">
        <div class="mb-3">
            <label for="api_key" class="form-label">Groq API Key</label>
            <input type="text" class="form-control" id="api_key" name="api_key" required>
        </div>
        <button type="submit" class="btn btn-primary">Submit</button>
    </form>
</div>"#;
    page("Enter Groq API Key", &[BOOTSTRAP_CSS], body)
}

pub fn home_page(customers: &[Customer], search: &str, chat: &[ChatEntry]) -> String {
    let mut body = String::with_capacity(4096 + customers.len() * 1024);
    let _ = write!(
        body,
        r#"<div class="container mt-5">
    <h1 class="mb-4">Advanced Customer Relationship Manager</h1>
    <div class="row mb-4">
        <div class="col-md-8">
            <form action="/" method="get" class="input-group">
                <input type="text" name="search" placeholder="Search by name, account, email, or phone..." class="form-control" value="{}">
                <button type="submit" class="btn btn-primary"><i class="bi bi-search"></i> Search</button>
            </form>
        </div>
        <div class="col-md-4 text-end">
            <a href="/export" class="btn btn-info"><i class="bi bi-download"></i> Export CSV</a>
        </div>
    </div>
"#,
        escape_html(search)
    );

    body.push_str(
        r#"    <form action="/add" method="post" class="mb-4">
        <div class="row g-3">
            <div class="col-md-3"><input type="text" name="name" placeholder="Customer Name" class="form-control" required></div>
            <div class="col-md-3"><input type="text" name="account" placeholder="Account Details" class="form-control" required></div>
            <div class="col-md-2"><input type="email" name="email" placeholder="Email" class="form-control"></div>
            <div class="col-md-2"><input type="text" name="phone" placeholder="Phone" class="form-control"></div>
            <div class="col-md-2"><button type="submit" class="btn btn-success w-100"><i class="bi bi-plus-circle"></i> Add</button></div>
        </div>
    </form>
    <table class="table table-striped table-hover" id="customerTable">
        <thead class="table-dark">
            <tr>
                <th onclick="sortTable(0)">ID <i class="bi bi-sort-down"></i></th>
                <th onclick="sortTable(1)">Name <i class="bi bi-sort-down"></i></th>
                <th onclick="sortTable(2)">Account <i class="bi bi-sort-down"></i></th>
                <th onclick="sortTable(3)">Email <i class="bi bi-sort-down"></i></th>
                <th onclick="sortTable(4)">Phone <i class="bi bi-sort-down"></i></th>
                <th onclick="sortTable(5)">Created At <i class="bi bi-sort-down"></i></th>
                <th>Actions</th>
                <th>AI Insight</th>
                <th>Interactions</th>
            </tr>
        </thead>
        <tbody>
"#,
    );

    for c in customers {
        let _ = write!(
            body,
            r#"            <tr>
                <td>{id}</td>
                <td>{name}</td>
                <td>{account}</td>
                <td>{email}</td>
                <td>{phone}</td>
                <td>{created}</td>
                <td>
                    <a href="/edit/{id}" class="btn btn-warning btn-sm"><i class="bi bi-pencil"></i> Edit</a>
                    <a href="/delete/{id}" class="btn btn-danger btn-sm" onclick="return confirm('Are you sure?');"><i class="bi bi-trash"></i> Delete</a>
                </td>
                <td><a href="/insight/{id}" class="btn btn-info btn-sm"><i class="bi bi-lightbulb"></i> Generate</a></td>
                <td><a href="/interactions/{id}" class="btn btn-primary btn-sm"><i class="bi bi-chat-dots"></i> View/Add</a></td>
            </tr>
"#,
            id = c.id,
            name = escape_html(&c.name),
            account = escape_html(&c.account),
            email = opt(c.email.as_deref()),
            phone = opt(c.phone.as_deref()),
            created = opt(c.created_at.as_deref()),
        );
    }

    body.push_str("        </tbody>\n    </table>\n");
    if customers.is_empty() {
        body.push_str("    <p class=\"text-muted\">No customers found. Add one above!</p>\n");
    }
    body.push_str("</div>\n");

    body.push_str(
        r#"<div class="chat-container">
    <div class="chat-toggle" onclick="toggleChat()"><i class="bi bi-chat-fill"></i></div>
    <div class="chat-window" id="chatWindow">
        <div class="chat-header">AI Assistant</div>
        <div class="chat-body" id="chatBody">
"#,
    );
    for entry in chat {
        let _ = write!(
            body,
            r#"            <div class="chat-message user-message" title="{}">{}</div>
            <div class="chat-message ai-message">{}</div>
"#,
            escape_html(&entry.timestamp),
            escape_html(&entry.user_message),
            entry.ai_response
        );
    }
    body.push_str(
        r#"        </div>
        <div class="chat-input">
            <input type="text" id="chatInput" placeholder="Ask about customers or anything...">
            <button onclick="sendMessage()">Send</button>
        </div>
    </div>
</div>
"#,
    );
    body.push_str(HOME_SCRIPT);

    page(
        "Advanced Customer Relationship Manager",
        &[BOOTSTRAP_CSS, BOOTSTRAP_ICONS, BOOTSTRAP_JS, ANIME_JS, HOME_STYLE],
        &body,
    )
}

pub fn edit_page(customer: &Customer) -> String {
    let body = format!(
        r#"<div class="container mt-5">
    <h1 class="mb-4">Edit Customer</h1>
    <form method="post">
        <div class="mb-3">
            <label for="name" class="form-label">Name</label>
            <input type="text" class="form-control" id="name" name="name" value="{}" required>
        </div>
        <div class="mb-3">
            <label for="account" class="form-label">Account</label>
            <input type="text" class="form-control" id="account" name="account" value="{}" required>
        </div>
        <div class="mb-3">
            <label for="email" class="form-label">Email</label>
            <input type="email" class="form-control" id="email" name="email" value="{}">
        </div>
        <div class="mb-3">
            <label for="phone" class="form-label">Phone</label>
            <input type="text" class="form-control" id="phone" name="phone" value="{}">
        </div>
        <button type="submit" class="btn btn-success">Update</button>
        <a href="/" class="btn btn-secondary ms-2">Cancel</a>
    </form>
</div>"#,
        escape_html(&customer.name),
        escape_html(&customer.account),
        opt(customer.email.as_deref()),
        opt(customer.phone.as_deref()),
    );
    page("Edit Customer", &[BOOTSTRAP_CSS], &body)
}

pub fn interactions_page(customer: &Customer, interactions: &[Interaction]) -> String {
    let name = escape_html(&customer.name);
    let mut body = String::with_capacity(2048 + interactions.len() * 512);
    let _ = write!(
        body,
        r#"<div class="container mt-5">
    <h1 class="mb-4">Interactions for {}</h1>
    <form method="post" class="mb-4">
        <div class="input-group">
            <input type="text" name="note" placeholder="Add a new interaction note..." class="form-control" required>
            <button type="submit" class="btn btn-primary">Add Note</button>
        </div>
    </form>
    <table class="table table-striped">
        <thead><tr><th>Date</th><th>Note</th><th>Action</th></tr></thead>
        <tbody>
"#,
        name
    );
    for i in interactions {
        let _ = write!(
            body,
            r#"            <tr>
                <td>{}</td>
                <td>{}</td>
                <td><a href="/delete_interaction/{}/{}" class="btn btn-danger btn-sm" onclick="return confirm('Delete this interaction?');">Delete</a></td>
            </tr>
"#,
            escape_html(&i.date),
            escape_html(&i.note),
            i.id,
            i.customer_id
        );
    }
    body.push_str(
        "        </tbody>\n    </table>\n    <a href=\"/\" class=\"btn btn-secondary mt-3\">Back to Home</a>\n</div>",
    );
    page(
        &format!("Interactions for {}", customer.name),
        &[BOOTSTRAP_CSS],
        &body,
    )
}

/// `insight_html` is rendered output; `raw_insight` is the model's Markdown,
/// carried in a hidden field so it can be saved as a note.
pub fn insight_page(customer: &Customer, insight_html: &str, raw_insight: &str) -> String {
    let body = format!(
        r#"<div class="container mt-5">
    <h1 class="mb-4 text-center"><i class="bi bi-lightbulb-fill me-2"></i>AI-Powered Insight for {name}</h1>
    <div class="card insight-card mb-4">
        <div class="card-header bg-primary text-white"><h4 class="mb-0">Customer Overview</h4></div>
        <div class="card-body customer-details">
            <p><strong>Account:</strong> {account}</p>
            <p><strong>Email:</strong> {email}</p>
            <p><strong>Phone:</strong> {phone}</p>
        </div>
    </div>
    <div class="card insight-card">
        <div class="card-header bg-info text-white"><h4 class="mb-0">Generated Insight</h4></div>
        <div class="card-body">
            {insight}
        </div>
    </div>
    <div class="mt-4 text-center">
        <a href="/insight/{id}" class="btn btn-warning me-2"><i class="bi bi-arrow-repeat"></i> Regenerate Insight</a>
        <form action="/add_insight_note/{id}" method="post" style="display: inline;">
            <input type="hidden" name="insight" value="{raw}">
            <button type="submit" class="btn btn-success me-2"><i class="bi bi-save"></i> Save as Interaction Note</button>
        </form>
        <a href="/interactions/{id}" class="btn btn-primary me-2"><i class="bi bi-chat-dots"></i> View Interactions</a>
        <a href="/" class="btn btn-secondary"><i class="bi bi-house-door"></i> Back to Home</a>
    </div>
    <div class="mt-5">
        <h3>Custom AI Query</h3>
        <form action="/custom_insight/{id}" method="post">
            <div class="input-group">
                <input type="text" name="custom_prompt" placeholder="Ask a custom question about this customer..." class="form-control" required>
                <button type="submit" class="btn btn-info">Query AI</button>
            </div>
        </form>
    </div>
</div>"#,
        name = escape_html(&customer.name),
        account = escape_html(&customer.account),
        email = opt_or_na(customer.email.as_deref()),
        phone = opt_or_na(customer.phone.as_deref()),
        insight = insight_html,
        id = customer.id,
        raw = escape_html(raw_insight),
    );
    page(
        &format!("AI Insight for {}", customer.name),
        &[BOOTSTRAP_CSS, BOOTSTRAP_ICONS, INSIGHT_STYLE],
        &body,
    )
}

pub fn custom_insight_page(customer: &Customer, query: &str, response_html: &str) -> String {
    let body = format!(
        r#"<div class="container mt-5">
    <h1 class="mb-4 text-center"><i class="bi bi-question-circle-fill me-2"></i>Custom AI Response for {}</h1>
    <div class="card insight-card">
        <div class="card-header bg-info text-white"><h4 class="mb-0">Query: {}</h4></div>
        <div class="card-body">
            {}
        </div>
    </div>
    <div class="mt-4 text-center">
        <a href="/insight/{}" class="btn btn-primary"><i class="bi bi-arrow-left"></i> Back to Insight</a>
    </div>
</div>"#,
        escape_html(&customer.name),
        escape_html(query),
        response_html,
        customer.id
    );
    page(
        &format!("Custom AI Insight for {}", customer.name),
        &[BOOTSTRAP_CSS, BOOTSTRAP_ICONS, INSIGHT_STYLE],
        &body,
    )
}
