use prepcast_core::Question;

/// The three seed questions stored by `setup`: one Quant, one Verbal, one Logic.
pub fn sample_questions() -> Vec<Question> {
    vec![
        Question {
            id: "cat_2023_quant_001".into(),
            subject: "Quant".into(),
            year: 2023,
            question_text: "If log₂(x) + log₂(y) = 5 and log₂(x) - log₂(y) = 1, find the value of xy."
                .into(),
            options: vec!["32".into(), "16".into(), "8".into(), "64".into()],
            correct_answer: "A".into(),
            topic: Some("Logarithms".into()),
            difficulty: Some("Medium".into()),
        },
        Question {
            id: "cat_2022_verbal_001".into(),
            subject: "Verbal".into(),
            year: 2022,
            question_text: "The passage discusses the impact of technology on modern education. \
                            Which of the following best summarizes the author's main argument?"
                .into(),
            options: vec![
                "Technology has completely revolutionized education".into(),
                "Technology offers both benefits and challenges to education".into(),
                "Traditional teaching methods are obsolete".into(),
                "Students prefer digital learning exclusively".into(),
            ],
            correct_answer: "B".into(),
            topic: Some("Reading Comprehension".into()),
            difficulty: Some("Medium".into()),
        },
        Question {
            id: "cat_2023_logic_001".into(),
            subject: "Logic".into(),
            year: 2023,
            question_text: "In a sequence, every third number is the sum of the previous two numbers. \
                            If the first two numbers are 1 and 2, what is the 8th number in the sequence?"
                .into(),
            options: vec!["21".into(), "34".into(), "55".into(), "89".into()],
            correct_answer: "A".into(),
            topic: Some("Sequences".into()),
            difficulty: Some("Medium".into()),
        },
    ]
}
