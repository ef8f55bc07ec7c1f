use crate::Category;

/// Instruction sent with every receipt image.
pub fn instruction() -> String {
    let categories = Category::KNOWN
        .iter()
        .map(|c| format!("\"{}\"", c.label()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"The image shows a receipt written in Swedish or English. Read it carefully and answer with a single JSON object of this shape:
{{
  "company_name": string,
  "cost": number,
  "raw_cost_text": string,
  "category": string,
  "date": string
}}
- "company_name": the name of the company that issued the receipt.
- "cost": the total amount paid. It is often labeled "Totalt", "Summa" or "Att betala" and may carry a currency such as SEK or kr. Take extra care to get it right.
- "raw_cost_text": the cost exactly as printed, before any parsing.
- "date": the receipt date formatted as "DD-MM-YYYY".
- "category": one of [{categories}].

If a value cannot be found use an empty string for text fields and 0 for numbers. Receipts almost always contain every field, so look closely.

Cost is printed in many ways, for example: "150.00", "1.234,56", "2 345,67 kr", "500 SEK", "150:-"."#
    )
}
