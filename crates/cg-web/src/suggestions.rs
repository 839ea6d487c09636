/// Starter questions offered on an empty chat
pub const SUGGESTED_QUESTIONS: [&str; 4] = [
    "What are the career options after FSC Pre-Medical?",
    "Which fields have the highest growth potential in healthcare?",
    "How can I transition from medical to business fields?",
    "What are the scope and salary of data science in healthcare?",
];
