//! Prompt assembly for SQL generation

/// Worked question/SQL pairs shown to the model before the real question
pub const FEW_SHOT_EXAMPLES: &str = "\
Example 1:
User question: List all employee names and their departments.
SQL: SELECT e.name, d.name AS department_name
     FROM employees e
     JOIN departments d ON e.department_id = d.id;

Example 2:
User question: Find the total sales amount per customer.
SQL: SELECT c.name AS customer_name, SUM(o.total_amount) AS total_sales
     FROM customers c
     JOIN orders o ON c.id = o.customer_id
     GROUP BY c.name;

Example 3:
User question: Get the average salary of employees in each department.
SQL: SELECT d.name AS department_name, AVG(e.salary) AS avg_salary
     FROM employees e
     JOIN departments d ON e.department_id = d.id
     GROUP BY d.name;

Example 4:
User question: Fetch top 5 most ordered items.
SQL: SELECT p.id AS product_id, p.name AS product_name, COUNT(oi.id) AS order_count
     FROM order_items oi
     JOIN products p ON oi.product_id = p.id
     GROUP BY p.id, p.name
     ORDER BY order_count DESC
     LIMIT 5;
";

const HEADER: &str =
    "You are a SQL assistant that generates **accurate, readable MySQL SELECT** queries.";

const GUIDELINES: &str = "\
Guidelines:
- Only output one valid SQL SELECT query.
- Do not include any explanation, reasoning, or markdown.
- Prefer aggregating/counting from the table that directly represents the user verb (e.g. use order_items for \"ordered\", orders for \"orders\", inventory for \"stock/received\").
- Avoid joins to auxiliary tables (inventory/products) unless needed for requested columns.
- If user asks about \"most ordered\", \"top-selling\", or \"ordered count\", use order_items as the primary table and then join products only to get names.
- Do not add extra joins that can filter results unnecessarily.
- Output must begin directly with SELECT and end with a semicolon.
- If you cannot determine the query confidently, still produce your best possible SELECT query instead of giving advice or instructions.
Never return explanations, hints, or commentary. Only the SQL statement.
";

/// Suffix appended when the first answer had no usable SQL
pub const RETRY_SUFFIX: &str = "\nNow output only the SQL query.";

/// Build the generation prompt from schema context and the question
pub fn build_prompt(context_text: &str, question: &str) -> String {
    format!(
        "\n{HEADER}\n\nHere are examples of correct queries:\n\n{FEW_SHOT_EXAMPLES}\n\n---\n\nSchema context:\n{context_text}\n\nUser question: {question}\n\n{GUIDELINES}"
    )
}

/// Prompt for the follow-up attempt
pub fn retry_prompt(prompt: &str) -> String {
    format!("{}{}", prompt, RETRY_SUFFIX)
}
