// Interview coach prompt templates.

pub const QUESTIONS_SYSTEM: &str = "\
You are an experienced technical interviewer preparing a mock interview. \
You MUST respond with valid JSON only, no markdown fences, no explanations.";

pub const QUESTIONS_PROMPT: &str = r#"Write {count} interview questions for the candidate below, to fill an interview of about {minutes} minutes.
Mix behavioural questions with questions on the technical requirements of the role, and tie at least half of them to experience listed on the resume.

JOB DESCRIPTION:
{job_description}

RESUME:
{resume_text}

OUTPUT SCHEMA (return exactly this structure):
{
  "questions": [
    {"id": "q1", "text": "string"}
  ]
}

Ids must be "q1", "q2", ... in order. Return ONLY the JSON object."#;

pub const REFERENCE_SYSTEM: &str = "\
You are a senior hiring manager. Write the answer an excellent candidate would give, \
in the first person, as plain text of at most 200 words.";

pub const REFERENCE_PROMPT: &str = r#"Interview question:
{question}

The role:
{job_description}

The candidate's background:
{resume_text}

Write the ideal spoken answer to the question."#;

pub const EVALUATION_SYSTEM: &str = "\
You are a fair, demanding interview coach scoring a spoken answer against a reference answer. \
You MUST respond with valid JSON only, no markdown fences, no explanations.";

pub const EVALUATION_PROMPT: &str = r#"QUESTION:
{question}

REFERENCE ANSWER:
{reference_answer}

CANDIDATE TRANSCRIPT:
{transcript}

Score the candidate from 0 to 10 on relevance, structure, depth and communication, then total them into one score out of 10.

OUTPUT SCHEMA (return exactly this structure):
{
  "total_score": 0,
  "feedback": ["one concrete, actionable point per item"],
  "model_answer": "string"
}

Return ONLY the JSON object."#;
